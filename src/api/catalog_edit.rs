//! Catalog admin endpoints: add, update and delete single entities.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;

use super::{extract_json, success, ApiResult};
use crate::catalog::edit::{self, ChainInput, CompanyInput, DeleteReport, StoreInput};
use crate::errors::AppError;
use crate::models::{Catalog, CatalogChain, CatalogCompany, CatalogStore};
use crate::AppState;

/// Load the cached catalog, apply one edit and store the result.
///
/// Nothing is written when the edit fails.
async fn edit_catalog<T, F>(state: &AppState, apply: F) -> Result<T, AppError>
where
    F: FnOnce(&mut Catalog) -> Result<T, AppError>,
{
    let mut catalog = state
        .store
        .get_catalog()
        .await?
        .ok_or_else(|| AppError::NotFound("No catalog stored".to_string()))?;

    let result = apply(&mut catalog)?;
    state.store.set_catalog(&catalog).await?;
    Ok(result)
}

async fn delete_from_catalog<F>(state: &AppState, kind: &str, id: &str, apply: F) -> ApiResult<DeleteReport>
where
    F: FnOnce(&mut Catalog, &str) -> DeleteReport,
{
    let report = edit_catalog(state, |catalog| Ok(apply(catalog, id))).await?;
    if report.removed {
        tracing::info!(
            "Deleted {} {} ({} chains detached, {} stores removed)",
            kind,
            id,
            report.chains_detached,
            report.stores_removed
        );
    }
    success(report)
}

fn log_saved<T: Serialize>(kind: &str, id: &str, value: T) -> ApiResult<T> {
    tracing::info!("Saved catalog {} {}", kind, id);
    success(value)
}

/// POST /api/catalog/companies - Add a company.
pub async fn add_company(
    State(state): State<AppState>,
    body: Result<Json<CompanyInput>, JsonRejection>,
) -> ApiResult<CatalogCompany> {
    let input = extract_json(body)?;
    let company = edit_catalog(&state, |c| edit::add_company(c, input)).await?;
    let id = company.id.clone();
    log_saved("company", &id, company)
}

/// PUT /api/catalog/companies/:id - Replace a company.
pub async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CompanyInput>, JsonRejection>,
) -> ApiResult<CatalogCompany> {
    let input = extract_json(body)?;
    let company = edit_catalog(&state, |c| edit::update_company(c, &id, input)).await?;
    log_saved("company", &id, company)
}

/// DELETE /api/catalog/companies/:id - Delete a company and detach it from chains.
pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteReport> {
    delete_from_catalog(&state, "company", &id, edit::delete_company).await
}

/// POST /api/catalog/chains - Add a chain.
pub async fn add_chain(
    State(state): State<AppState>,
    body: Result<Json<ChainInput>, JsonRejection>,
) -> ApiResult<CatalogChain> {
    let input = extract_json(body)?;
    let chain = edit_catalog(&state, |c| edit::add_chain(c, input)).await?;
    let id = chain.id.clone();
    log_saved("chain", &id, chain)
}

/// PUT /api/catalog/chains/:id - Replace a chain.
pub async fn update_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ChainInput>, JsonRejection>,
) -> ApiResult<CatalogChain> {
    let input = extract_json(body)?;
    let chain = edit_catalog(&state, |c| edit::update_chain(c, &id, input)).await?;
    log_saved("chain", &id, chain)
}

/// DELETE /api/catalog/chains/:id - Delete a chain and all of its stores.
pub async fn delete_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteReport> {
    delete_from_catalog(&state, "chain", &id, edit::delete_chain).await
}

/// POST /api/catalog/stores - Add a store.
pub async fn add_store(
    State(state): State<AppState>,
    body: Result<Json<StoreInput>, JsonRejection>,
) -> ApiResult<CatalogStore> {
    let input = extract_json(body)?;
    let store = edit_catalog(&state, |c| edit::add_store(c, input)).await?;
    let id = store.id.clone();
    log_saved("store", &id, store)
}

/// PUT /api/catalog/stores/:id - Replace a store.
pub async fn update_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StoreInput>, JsonRejection>,
) -> ApiResult<CatalogStore> {
    let input = extract_json(body)?;
    let store = edit_catalog(&state, |c| edit::update_store(c, &id, input)).await?;
    log_saved("store", &id, store)
}

/// DELETE /api/catalog/stores/:id - Delete a store.
pub async fn delete_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteReport> {
    delete_from_catalog(&state, "store", &id, edit::delete_store).await
}
