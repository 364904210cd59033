//! User resolution and the user lifecycle webhook.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::NewUser;
use crate::error::{Error, Result};
use crate::types::{Caller, UserId};

use super::TaskManager;

/// User lifecycle event delivered by the authentication provider
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEvent {
    /// `user.created`, `user.updated` or `user.deleted`; other types are ignored
    #[serde(rename = "type")]
    pub event_type: String,
    /// Profile of the affected user
    pub data: UserEventData,
}

/// Profile carried by a [`UserEvent`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserEventData {
    /// External identity
    pub id: String,
    /// Email addresses; the first one is stored
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Avatar image URL
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One email address of a [`UserEventData`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailAddress {
    /// The address
    pub email_address: String,
}

impl From<&UserEventData> for NewUser {
    fn from(data: &UserEventData) -> Self {
        NewUser {
            external_id: data.id.clone(),
            email: data.email_addresses.first().map(|e| e.email_address.clone()),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            avatar_url: data.image_url.clone(),
        }
    }
}

impl TaskManager {
    /// Resolve the internal user behind a caller
    ///
    /// Test-mode callers are provisioned on first use; for everyone else a missing user is
    /// [`Error::NotFound`].
    pub async fn resolve_user(&self, caller: &Caller) -> Result<UserId> {
        if caller.test_mode {
            return self.ensure_user(&caller.external_id).await;
        }

        self.db
            .find_user_by_external_id(&caller.external_id)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| Error::NotFound("user".to_string()))
    }

    /// Get or create a placeholder user for an external identity
    pub async fn ensure_user(&self, external_id: &str) -> Result<UserId> {
        if let Some(user) = self.db.find_user_by_external_id(external_id).await? {
            return Ok(user.id);
        }

        let user_id = self
            .db
            .insert_user_if_absent(&NewUser {
                external_id: external_id.to_string(),
                email: Some(format!("test_{}@example.invalid", external_id)),
                first_name: Some("Test".to_string()),
                last_name: Some("User".to_string()),
                avatar_url: None,
            })
            .await?;

        tracing::info!(external_id, user_id = user_id.0, "Provisioned test user");
        Ok(user_id)
    }

    /// Apply a user lifecycle event
    ///
    /// Deleting a user cascades to its tasks and song links. Updating or deleting an unknown
    /// identity is [`Error::NotFound`]; unknown event types are ignored.
    pub async fn apply_user_event(&self, event: &UserEvent) -> Result<()> {
        if event.data.id.trim().is_empty() {
            return Err(Error::Validation("user id is required".to_string()));
        }

        let external_id = event.data.id.as_str();

        match event.event_type.as_str() {
            "user.created" => {
                let user_id = self.db.upsert_user(&NewUser::from(&event.data)).await?;
                tracing::info!(external_id, user_id = user_id.0, "User created");
            }
            "user.updated" => {
                if !self.db.update_user(&NewUser::from(&event.data)).await? {
                    return Err(Error::NotFound("user".to_string()));
                }
                tracing::info!(external_id, "User updated");
            }
            "user.deleted" => {
                if !self.db.delete_user_by_external_id(external_id).await? {
                    return Err(Error::NotFound("user".to_string()));
                }
                tracing::info!(external_id, "User deleted");
            }
            other => {
                tracing::debug!(event_type = other, "Ignoring user event");
            }
        }

        Ok(())
    }
}
