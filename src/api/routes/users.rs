//! User lifecycle webhook.

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::manager::UserEvent;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

/// POST /webhooks/users - Apply a user lifecycle event
#[utoipa::path(
    post,
    path = "/webhooks/users",
    tag = "users",
    request_body = UserEvent,
    params(
        ("X-Webhook-Secret" = String, Header, description = "Shared webhook secret")
    ),
    responses(
        (status = 204, description = "Event applied (or ignored for unknown types)"),
        (status = 400, description = "Malformed event", body = crate::error::ApiError),
        (status = 401, description = "Missing or wrong webhook secret", body = crate::error::ApiError),
        (status = 404, description = "Updated or deleted user does not exist", body = crate::error::ApiError)
    )
)]
pub async fn user_webhook(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UserEvent>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(event) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    state.manager.apply_user_event(&event).await?;
    Ok(StatusCode::NO_CONTENT)
}
