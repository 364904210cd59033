//! Submission and task status handlers.

use super::{RecentTasks, SubmitRequest, TaskQuery};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{Caller, SubmitReceipt};
use axum::{
    Extension, Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
};

/// POST /download - Submit a source URL for acquisition
#[utoipa::path(
    post,
    path = "/download",
    tag = "download",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Task created (COMPLETED immediately for fixture URLs)", body = SubmitReceipt),
        (status = 400, description = "Missing url or unrecognised platform", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 404, description = "Unknown user", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_download(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: std::result::Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitReceipt>> {
    let Json(request) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let url = request
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| Error::Validation("url is required".to_string()))?;

    let receipt = state.manager.submit(&caller, &url).await?;
    Ok(Json(receipt))
}

/// GET /download - Task status, or the caller's recent tasks
#[utoipa::path(
    get,
    path = "/download",
    tag = "download",
    params(
        ("task_id" = Option<i64>, Query, description = "Task ID; omit to list recent tasks")
    ),
    responses(
        (status = 200, description = "A single task when task_id is given, otherwise {tasks: [...]}", body = crate::types::TaskInfo),
        (status = 400, description = "Malformed task_id", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 404, description = "Task not found or not owned by the caller", body = crate::error::ApiError)
    )
)]
pub async fn get_downloads(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: std::result::Result<Query<TaskQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    match query.task_id {
        Some(task_id) => {
            let task = state.manager.get_status(&caller, task_id).await?;
            Ok(Json(task).into_response())
        }
        None => {
            let tasks = state.manager.list_recent(&caller).await?;
            Ok(Json(RecentTasks { tasks }).into_response())
        }
    }
}
