//! Catalog models: the published reference dataset of companies, chains and stores.

use serde::{Deserialize, Deserializer, Serialize};

/// A listed company offering shareholder perks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCompany {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub chain_ids: Vec<String>,
    #[serde(default)]
    pub voucher_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A brand-level grouping of stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogChain {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub company_ids: Vec<String>,
    #[serde(default)]
    pub voucher_types: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A physical location belonging to a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStore {
    pub id: String,
    pub chain_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(deserialize_with = "coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "coordinate")]
    pub lng: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl CatalogStore {
    pub fn has_finite_coordinates(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// The catalog aggregate. Always replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub version: String,
    #[serde(default)]
    pub companies: Vec<CatalogCompany>,
    #[serde(default)]
    pub chains: Vec<CatalogChain>,
    #[serde(default)]
    pub stores: Vec<CatalogStore>,
}

/// Change-detection cache for the last applied catalog payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Epoch milliseconds of the last successful sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<i64>,
}

/// The small published document pointing at the current catalog payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub version: String,
    pub hash: String,
    /// Payload file name, relative to the manifest location
    pub url: String,
}

/// Published payloads write unparseable coordinates as `null`; keep the record
/// and let integrity checks report it.
fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
