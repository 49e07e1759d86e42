//! Holding API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{Local, Utc};

use super::{extract_json, success, ApiResult};
use crate::catalog::CatalogIndex;
use crate::errors::AppError;
use crate::models::{sort_by_expiry, Holding, HoldingInput, HoldingSummary};
use crate::AppState;

/// GET /api/holdings - List holdings, soonest expiry first.
pub async fn list_holdings(State(state): State<AppState>) -> ApiResult<Vec<Holding>> {
    let mut holdings = state.store.list_holdings().await?;
    sort_by_expiry(&mut holdings);
    success(holdings)
}

/// GET /api/holdings/summary - Expiry counts for the dashboard.
pub async fn holdings_summary(State(state): State<AppState>) -> ApiResult<HoldingSummary> {
    let holdings = state.store.list_holdings().await?;
    success(HoldingSummary::compute(&holdings, Local::now().date_naive()))
}

/// GET /api/holdings/:id - Get a single holding.
pub async fn get_holding(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Holding> {
    match state.store.get_holding(&id).await? {
        Some(holding) => success(holding),
        None => Err(AppError::NotFound(format!("Holding {} not found", id))),
    }
}

/// POST /api/holdings - Create a holding with a new ID.
pub async fn create_holding(
    State(state): State<AppState>,
    body: Result<Json<HoldingInput>, JsonRejection>,
) -> ApiResult<Holding> {
    let input = extract_json(body)?;
    let id = uuid::Uuid::new_v4().to_string();
    save_holding(&state, id, input).await.and_then(success)
}

/// PUT /api/holdings/:id - Replace a holding, keeping its creation time.
pub async fn update_holding(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<HoldingInput>, JsonRejection>,
) -> ApiResult<Holding> {
    let input = extract_json(body)?;
    save_holding(&state, id, input).await.and_then(success)
}

/// DELETE /api/holdings/:id - Delete a holding. Unknown IDs are not an error.
pub async fn delete_holding(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.store.delete_holding(&id).await?;
    success(())
}

async fn save_holding(state: &AppState, id: String, mut input: HoldingInput) -> Result<Holding, AppError> {
    input
        .validate(&state.config.voucher_types)
        .map_err(AppError::Validation)?;

    if input.company_id.as_deref().map_or(true, str::is_empty) {
        input.company_id = resolve_company_code(state, &input.company_name).await?;
    }

    let existing = state.store.get_holding(&id).await?;
    let holding = input.into_holding(id, existing.as_ref(), Utc::now().timestamp_millis());
    state.store.put_holding(&holding).await?;

    tracing::info!("Saved holding {} ({})", holding.id, holding.company_name);
    Ok(holding)
}

/// Ticker of the catalog company with this exact name, if any.
async fn resolve_company_code(state: &AppState, company_name: &str) -> Result<Option<String>, AppError> {
    let Some(catalog) = state.store.get_catalog().await? else {
        return Ok(None);
    };
    let index = CatalogIndex::new(&catalog);
    Ok(index
        .company_by_name(company_name.trim())
        .and_then(|c| c.ticker.clone()))
}
