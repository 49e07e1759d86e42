//! Advisory referential-integrity diagnostics over a catalog.
//!
//! Nothing here blocks a write: a catalog with dangling references can still be
//! stored and used.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::Catalog;

/// One integrity problem found in a catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// A chain lists a company ID that does not exist.
    #[serde(rename_all = "camelCase")]
    UnknownCompany {
        chain_id: String,
        chain_name: String,
        company_id: String,
    },
    /// A store points at a chain ID that does not exist.
    #[serde(rename_all = "camelCase")]
    UnknownChain {
        store_id: String,
        store_name: String,
        chain_id: String,
    },
    /// A store has a NaN or infinite coordinate.
    #[serde(rename_all = "camelCase")]
    NonFiniteCoordinate { store_id: String, store_name: String },
    /// A store has a finite coordinate outside the valid lat/lng range.
    #[serde(rename_all = "camelCase")]
    CoordinateOutOfRange {
        store_id: String,
        store_name: String,
        lat: f64,
        lng: f64,
    },
}

impl Diagnostic {
    /// Human readable description for review surfaces.
    pub fn describe(&self) -> String {
        match self {
            Diagnostic::UnknownCompany {
                chain_name,
                company_id,
                ..
            } => format!("Chain {} lists unknown company ID: {}", chain_name, company_id),
            Diagnostic::UnknownChain {
                store_name,
                chain_id,
                ..
            } => format!("Store {} has unknown chain ID: {}", store_name, chain_id),
            Diagnostic::NonFiniteCoordinate { store_name, .. } => {
                format!("Store {} has a non-finite coordinate", store_name)
            }
            Diagnostic::CoordinateOutOfRange {
                store_name,
                lat,
                lng,
                ..
            } => format!(
                "Store {} has an out-of-range coordinate ({}, {})",
                store_name, lat, lng
            ),
        }
    }
}

/// Run every check and return one diagnostic per offending reference.
pub fn check(catalog: &Catalog) -> Vec<Diagnostic> {
    let company_ids: HashSet<&str> = catalog.companies.iter().map(|c| c.id.as_str()).collect();
    let chain_ids: HashSet<&str> = catalog.chains.iter().map(|c| c.id.as_str()).collect();

    let mut diagnostics = Vec::new();

    for chain in &catalog.chains {
        for company_id in &chain.company_ids {
            if !company_ids.contains(company_id.as_str()) {
                diagnostics.push(Diagnostic::UnknownCompany {
                    chain_id: chain.id.clone(),
                    chain_name: chain.display_name.clone(),
                    company_id: company_id.clone(),
                });
            }
        }
    }

    for store in &catalog.stores {
        if !chain_ids.contains(store.chain_id.as_str()) {
            diagnostics.push(Diagnostic::UnknownChain {
                store_id: store.id.clone(),
                store_name: store.name.clone(),
                chain_id: store.chain_id.clone(),
            });
        }

        if !store.has_finite_coordinates() {
            diagnostics.push(Diagnostic::NonFiniteCoordinate {
                store_id: store.id.clone(),
                store_name: store.name.clone(),
            });
        } else if !(-90.0..=90.0).contains(&store.lat) || !(-180.0..=180.0).contains(&store.lng) {
            diagnostics.push(Diagnostic::CoordinateOutOfRange {
                store_id: store.id.clone(),
                store_name: store.name.clone(),
                lat: store.lat,
                lng: store.lng,
            });
        }
    }

    diagnostics
}
