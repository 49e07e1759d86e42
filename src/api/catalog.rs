//! Catalog API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{extract_json, success, ApiResult};
use crate::catalog::csv::{export_table, CatalogTable};
use crate::catalog::integrity::{self, Diagnostic};
use crate::catalog::query::{filter_stores, GeoPoint, StoreFilter, StoreQueryResult};
use crate::catalog::CatalogIndex;
use crate::errors::AppError;
use crate::models::{Catalog, CatalogMeta};
use crate::AppState;

/// Maximum number of stores a single query may return.
const MAX_STORE_LIMIT: usize = 5000;

/// GET /api/catalog - The cached catalog, or null.
pub async fn get_catalog(State(state): State<AppState>) -> ApiResult<Option<Catalog>> {
    success(state.store.get_catalog().await?)
}

/// PUT /api/catalog - Replace the cached catalog; returns its diagnostics.
pub async fn put_catalog(
    State(state): State<AppState>,
    body: Result<Json<Catalog>, JsonRejection>,
) -> ApiResult<Vec<Diagnostic>> {
    let catalog = extract_json(body)?;
    let diagnostics = integrity::check(&catalog);
    state.store.set_catalog(&catalog).await?;

    tracing::info!(
        "Catalog {} saved manually with {} diagnostics",
        catalog.version,
        diagnostics.len()
    );
    success(diagnostics)
}

/// GET /api/catalog/meta - Sync metadata, or null.
pub async fn get_catalog_meta(State(state): State<AppState>) -> ApiResult<Option<CatalogMeta>> {
    success(state.store.get_catalog_meta().await?)
}

/// GET /api/catalog/diagnostics - Referential integrity report.
pub async fn get_diagnostics(State(state): State<AppState>) -> ApiResult<Vec<Diagnostic>> {
    let diagnostics = state
        .store
        .get_catalog()
        .await?
        .map(|catalog| integrity::check(&catalog))
        .unwrap_or_default();
    success(diagnostics)
}

/// Store query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreQueryParams {
    pub category: Option<String>,
    pub company_id: Option<String>,
    pub chain_id: Option<String>,
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

impl StoreQueryParams {
    fn into_filter(self) -> Result<StoreFilter, AppError> {
        let near = match (self.lat, self.lng, self.radius_km) {
            (None, None, None) => None,
            (Some(lat), Some(lng), Some(radius)) if radius >= 0.0 => {
                Some((GeoPoint { lat, lng }, radius))
            }
            _ => {
                return Err(AppError::BadRequest(
                    "lat, lng and a non-negative radiusKm must be given together".to_string(),
                ))
            }
        };

        Ok(StoreFilter {
            category: self.category.filter(|s| !s.is_empty()),
            company_id: self.company_id.filter(|s| !s.is_empty()),
            chain_id: self.chain_id.filter(|s| !s.is_empty()),
            text: self.q,
            near,
            limit: self.limit.map(|l| l.min(MAX_STORE_LIMIT)),
        })
    }
}

/// GET /api/catalog/stores - Filter stores by chain, company, text or distance.
pub async fn query_stores(
    State(state): State<AppState>,
    Query(params): Query<StoreQueryParams>,
) -> ApiResult<StoreQueryResult> {
    let filter = params.into_filter()?;

    let result = match state.store.get_catalog().await? {
        Some(catalog) => filter_stores(&CatalogIndex::new(&catalog), &filter),
        None => StoreQueryResult {
            total: 0,
            stores: Vec::new(),
        },
    };
    success(result)
}

/// GET /api/catalog/export/:file - One catalog table as CSV.
pub async fn export_catalog_csv(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let table = CatalogTable::from_file_name(&file)
        .ok_or_else(|| AppError::NotFound(format!("Unknown export {}", file)))?;
    let catalog = state
        .store
        .get_catalog()
        .await?
        .ok_or_else(|| AppError::NotFound("No catalog stored".to_string()))?;

    let disposition = format!("attachment; filename=\"{}\"", table.file_name());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export_table(&catalog, table),
    )
        .into_response())
}
