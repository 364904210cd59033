//! Users keyed by the external identity of the authentication provider.

use crate::error::DatabaseError;
use crate::types::UserId;
use crate::{Error, Result};

use super::{Database, NewUser, UserRow};

impl Database {
    /// Find a user by external identity
    pub async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, external_id, email, first_name, last_name, avatar_url,
                   created_at, updated_at
            FROM users
            WHERE external_id = ?
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find user: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Insert a user, or refresh the profile of an existing one with the same identity
    pub async fn upsert_user(&self, user: &NewUser) -> Result<UserId> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (
                external_id, email, first_name, last_name, avatar_url, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                email = excluded.email,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&user.external_id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert user: {}",
                e
            )))
        })?;

        self.user_id_of(&user.external_id).await
    }

    /// Insert a user unless one with the same identity already exists
    ///
    /// Existing profiles are left untouched.
    pub async fn insert_user_if_absent(&self, user: &NewUser) -> Result<UserId> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (
                external_id, email, first_name, last_name, avatar_url, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO NOTHING
            "#,
        )
        .bind(&user.external_id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert user: {}",
                e
            )))
        })?;

        self.user_id_of(&user.external_id).await
    }

    /// Update the profile of an existing user
    ///
    /// Returns false when no user has the given identity.
    pub async fn update_user(&self, user: &NewUser) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, first_name = ?, last_name = ?, avatar_url = ?, updated_at = ?
            WHERE external_id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar_url)
        .bind(now)
        .bind(&user.external_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update user: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by identity; tasks and song links cascade
    ///
    /// Returns false when no user has the given identity.
    pub async fn delete_user_by_external_id(&self, external_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete user: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn user_id_of(&self, external_id: &str) -> Result<UserId> {
        let id: Option<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE external_id = ?")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to look up user id: {}",
                        e
                    )))
                })?;

        id.ok_or_else(|| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "User {} vanished after write",
                external_id
            )))
        })
    }
}
