//! Backup export and restore endpoints.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Local;
use serde::Deserialize;

use super::{success, ApiResult};
use crate::backup::{self, RestoreOptions, RestoreReport};
use crate::errors::AppError;
use crate::AppState;

/// GET /api/backup - Download the whole local state as one JSON document.
pub async fn export_backup(State(state): State<AppState>) -> Result<Response, AppError> {
    let document = backup::export(&state.store).await?;
    let body = serde_json::to_string_pretty(&document)
        .map_err(|e| AppError::Internal(format!("Failed to encode backup: {}", e)))?;

    let filename = format!("yutai-backup-{}.json", Local::now().format("%Y-%m-%d"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct RestoreParams {
    /// Restore even when the document has no schemaVersion
    #[serde(default)]
    pub confirm: bool,
}

/// POST /api/backup/restore - Clear everything and load the posted backup.
pub async fn restore_backup(
    State(state): State<AppState>,
    Query(params): Query<RestoreParams>,
    body: String,
) -> ApiResult<RestoreReport> {
    let options = RestoreOptions {
        confirm_unversioned: params.confirm,
    };
    success(backup::import_json(&state.store, &body, options).await?)
}
