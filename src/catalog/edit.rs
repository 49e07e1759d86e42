//! Per-entity catalog edits for the admin surface.
//!
//! Each operation works on an in-memory [`Catalog`]; the caller stores the
//! result wholesale. Deletes cascade: a removed company is detached from every
//! chain, and a removed chain takes its stores with it.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, FieldError};
use crate::models::{Catalog, CatalogChain, CatalogCompany, CatalogStore};

/// Category given to a chain saved without one.
pub const DEFAULT_CATEGORY: &str = "その他";

/// Company fields accepted on add and update. `id` is only read on add.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub chain_ids: Vec<String>,
    #[serde(default)]
    pub voucher_types: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Chain fields accepted on add and update. `id` is only read on add.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub company_ids: Vec<String>,
    #[serde(default)]
    pub voucher_types: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A coordinate as typed into a form: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Number(f64),
    Text(String),
}

impl CoordinateInput {
    fn value(&self) -> Option<f64> {
        match self {
            CoordinateInput::Number(n) => Some(*n),
            CoordinateInput::Text(t) => t.trim().parse().ok(),
        }
    }
}

/// Store fields accepted on add and update.
///
/// On add a missing `id` is generated from the chain. On update a blank
/// `chainId` keeps the store's current chain.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub lat: Option<CoordinateInput>,
    #[serde(default)]
    pub lng: Option<CoordinateInput>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// What a delete removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub removed: bool,
    /// Chains that lost a reference to a deleted company
    pub chains_detached: usize,
    /// Stores removed along with a deleted chain
    pub stores_removed: usize,
}

// ==================== COMPANIES ====================

pub fn add_company(catalog: &mut Catalog, input: CompanyInput) -> Result<CatalogCompany, AppError> {
    let id = required_id(input.id.as_deref())?;
    ensure_unique(catalog.companies.iter().map(|c| c.id.as_str()), &id)?;

    let company = build_company(id, input)?;
    catalog.companies.push(company.clone());
    Ok(company)
}

pub fn update_company(
    catalog: &mut Catalog,
    id: &str,
    input: CompanyInput,
) -> Result<CatalogCompany, AppError> {
    let company = build_company(id.to_string(), input)?;
    let slot = catalog
        .companies
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| not_found("Company", id))?;

    *slot = company.clone();
    Ok(company)
}

/// Remove a company and detach it from every chain. Unknown IDs are a no-op.
pub fn delete_company(catalog: &mut Catalog, id: &str) -> DeleteReport {
    let before = catalog.companies.len();
    catalog.companies.retain(|c| c.id != id);

    let mut chains_detached = 0;
    for chain in &mut catalog.chains {
        let count = chain.company_ids.len();
        chain.company_ids.retain(|c| c != id);
        if chain.company_ids.len() != count {
            chains_detached += 1;
        }
    }

    DeleteReport {
        removed: catalog.companies.len() != before,
        chains_detached,
        stores_removed: 0,
    }
}

fn build_company(id: String, input: CompanyInput) -> Result<CatalogCompany, AppError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "name",
            "Company name is required",
        )]));
    }

    Ok(CatalogCompany {
        id,
        name,
        ticker: non_blank(input.ticker),
        url: non_blank(input.url),
        chain_ids: clean_list(input.chain_ids),
        voucher_types: clean_list(input.voucher_types),
        notes: non_blank(input.notes),
    })
}

// ==================== CHAINS ====================

pub fn add_chain(catalog: &mut Catalog, input: ChainInput) -> Result<CatalogChain, AppError> {
    let id = required_id(input.id.as_deref())?;
    ensure_unique(catalog.chains.iter().map(|c| c.id.as_str()), &id)?;

    let chain = build_chain(id, input)?;
    catalog.chains.push(chain.clone());
    Ok(chain)
}

pub fn update_chain(catalog: &mut Catalog, id: &str, input: ChainInput) -> Result<CatalogChain, AppError> {
    let chain = build_chain(id.to_string(), input)?;
    let slot = catalog
        .chains
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| not_found("Chain", id))?;

    *slot = chain.clone();
    Ok(chain)
}

/// Remove a chain together with all of its stores. Unknown IDs are a no-op.
pub fn delete_chain(catalog: &mut Catalog, id: &str) -> DeleteReport {
    let chains_before = catalog.chains.len();
    let stores_before = catalog.stores.len();

    catalog.chains.retain(|c| c.id != id);
    catalog.stores.retain(|s| s.chain_id != id);

    DeleteReport {
        removed: catalog.chains.len() != chains_before,
        chains_detached: 0,
        stores_removed: stores_before - catalog.stores.len(),
    }
}

fn build_chain(id: String, input: ChainInput) -> Result<CatalogChain, AppError> {
    let display_name = input.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "displayName",
            "Chain name is required",
        )]));
    }

    Ok(CatalogChain {
        id,
        display_name,
        category: non_blank(input.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        company_ids: clean_list(input.company_ids),
        voucher_types: clean_list(input.voucher_types),
        tags: clean_list(input.tags),
        url: non_blank(input.url),
    })
}

// ==================== STORES ====================

pub fn add_store(catalog: &mut Catalog, input: StoreInput) -> Result<CatalogStore, AppError> {
    let requested_id = non_blank(input.id.clone());
    let mut store = build_store(catalog, String::new(), input, None)?;

    store.id = requested_id.unwrap_or_else(|| {
        format!(
            "store-{}-{}",
            store.chain_id.trim_start_matches("chain-"),
            Utc::now().timestamp_millis()
        )
    });
    ensure_unique(catalog.stores.iter().map(|s| s.id.as_str()), &store.id)?;

    catalog.stores.push(store.clone());
    Ok(store)
}

pub fn update_store(catalog: &mut Catalog, id: &str, input: StoreInput) -> Result<CatalogStore, AppError> {
    let current_chain = catalog
        .stores
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.chain_id.clone())
        .ok_or_else(|| not_found("Store", id))?;

    let store = build_store(catalog, id.to_string(), input, Some(&current_chain))?;
    if let Some(slot) = catalog.stores.iter_mut().find(|s| s.id == id) {
        *slot = store.clone();
    }
    Ok(store)
}

/// Remove a store. Unknown IDs are a no-op.
pub fn delete_store(catalog: &mut Catalog, id: &str) -> DeleteReport {
    let before = catalog.stores.len();
    catalog.stores.retain(|s| s.id != id);

    DeleteReport {
        removed: catalog.stores.len() != before,
        ..Default::default()
    }
}

/// Validate a store and stamp `updatedAt`. Every bad field is reported at once.
fn build_store(
    catalog: &Catalog,
    id: String,
    input: StoreInput,
    current_chain: Option<&str>,
) -> Result<CatalogStore, AppError> {
    let mut errors = Vec::new();

    let chain_id = non_blank(input.chain_id)
        .or_else(|| current_chain.map(str::to_string))
        .unwrap_or_default();
    if chain_id.is_empty() {
        errors.push(FieldError::new("chainId", "Chain is required"));
    } else if !catalog.chains.iter().any(|c| c.id == chain_id) {
        errors.push(FieldError::new("chainId", format!("Unknown chain {}", chain_id)));
    }

    let name = input.name.trim().to_string();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Store name is required"));
    }

    let lat = coordinate("lat", input.lat.as_ref(), 90.0, &mut errors);
    let lng = coordinate("lng", input.lng.as_ref(), 180.0, &mut errors);

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(CatalogStore {
        id,
        chain_id,
        name,
        address: input.address.trim().to_string(),
        lat,
        lng,
        tags: clean_list(input.tags),
        updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

fn coordinate(field: &str, input: Option<&CoordinateInput>, limit: f64, errors: &mut Vec<FieldError>) -> f64 {
    match input.and_then(CoordinateInput::value) {
        Some(v) if v.is_finite() && v.abs() <= limit => v,
        _ => {
            errors.push(FieldError::new(
                field,
                format!("Must be a number between -{} and {}", limit, limit),
            ));
            f64::NAN
        }
    }
}

// ==================== HELPERS ====================

fn required_id(id: Option<&str>) -> Result<String, AppError> {
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(AppError::Validation(vec![FieldError::new("id", "ID is required")])),
    }
}

fn ensure_unique<'a>(mut existing: impl Iterator<Item = &'a str>, id: &str) -> Result<(), AppError> {
    if existing.any(|e| e == id) {
        return Err(AppError::Validation(vec![FieldError::new(
            "id",
            format!("ID {} already exists", id),
        )]));
    }
    Ok(())
}

fn not_found(kind: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} {} not found", kind, id))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
