//! Catalog sync trigger.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::sync::SyncOutcome;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub updated: bool,
    pub outcome: SyncOutcome,
}

/// POST /api/catalog/sync - Check the manifest and refresh the catalog if it changed.
pub async fn sync_catalog(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> ApiResult<SyncResponse> {
    let outcome = state.sync.sync(params.force).await;
    success(SyncResponse {
        updated: outcome.applied(),
        outcome,
    })
}
