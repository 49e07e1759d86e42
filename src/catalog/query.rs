//! Store filtering for map and admin views.

use serde::{Deserialize, Serialize};

use super::CatalogIndex;
use crate::models::CatalogStore;

/// Mean Earth radius used for distance calculations.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default cap on returned stores.
pub const DEFAULT_STORE_LIMIT: usize = 500;

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Great-circle distance between two points in kilometres (haversine).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Filters applied to the catalog's stores. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    /// Chain category
    pub category: Option<String>,
    /// Company operating the store's chain
    pub company_id: Option<String>,
    pub chain_id: Option<String>,
    /// Case-insensitive substring of store name or address
    pub text: Option<String>,
    /// Center and radius in kilometres
    pub near: Option<(GeoPoint, f64)>,
    pub limit: Option<usize>,
}

/// A store with its joins resolved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMatch {
    pub store: CatalogStore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub company_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Result of a store query: matches up to the limit plus the full match count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreQueryResult {
    pub total: usize,
    pub stores: Vec<StoreMatch>,
}

/// Run a store query in catalog order.
pub fn filter_stores(index: &CatalogIndex<'_>, filter: &StoreFilter) -> StoreQueryResult {
    let needle = filter
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);
    let limit = filter.limit.unwrap_or(DEFAULT_STORE_LIMIT);

    let mut total = 0;
    let mut stores = Vec::new();

    for store in &index.catalog().stores {
        let chain = index.chain_of(store);

        if let Some(category) = &filter.category {
            if chain.map(|c| &c.category) != Some(category) {
                continue;
            }
        }
        if let Some(company_id) = &filter.company_id {
            if !chain.is_some_and(|c| c.company_ids.contains(company_id)) {
                continue;
            }
        }
        if let Some(chain_id) = &filter.chain_id {
            if &store.chain_id != chain_id {
                continue;
            }
        }
        if let Some(needle) = &needle {
            let hit = store.name.to_lowercase().contains(needle)
                || store.address.to_lowercase().contains(needle);
            if !hit {
                continue;
            }
        }

        let distance = match filter.near {
            Some((center, radius_km)) => {
                if !store.has_finite_coordinates() {
                    continue;
                }
                let d = distance_km(
                    center,
                    GeoPoint {
                        lat: store.lat,
                        lng: store.lng,
                    },
                );
                if d > radius_km {
                    continue;
                }
                Some(d)
            }
            None => None,
        };

        total += 1;
        if stores.len() < limit {
            stores.push(StoreMatch {
                store: store.clone(),
                chain_name: chain.map(|c| c.display_name.clone()),
                category: chain.map(|c| c.category.clone()),
                company_names: index
                    .companies_of(store)
                    .iter()
                    .map(|c| c.name.clone())
                    .collect(),
                distance_km: distance,
            });
        }
    }

    StoreQueryResult { total, stores }
}
