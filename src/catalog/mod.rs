//! Read-side helpers over a stored catalog: joins, diagnostics, queries and CSV export.

pub mod csv;
pub mod edit;
pub mod integrity;
pub mod query;

use std::collections::HashMap;

use crate::models::{Catalog, CatalogChain, CatalogCompany, CatalogStore};

/// ID lookups over a borrowed catalog.
///
/// Unresolved references are skipped rather than reported; use
/// [`integrity::check`] to list them.
pub struct CatalogIndex<'a> {
    catalog: &'a Catalog,
    companies: HashMap<&'a str, &'a CatalogCompany>,
    chains: HashMap<&'a str, &'a CatalogChain>,
}

impl<'a> CatalogIndex<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let companies = catalog
            .companies
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect();
        let chains = catalog.chains.iter().map(|c| (c.id.as_str(), c)).collect();

        Self {
            catalog,
            companies,
            chains,
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn company(&self, id: &str) -> Option<&'a CatalogCompany> {
        self.companies.get(id).copied()
    }

    pub fn chain(&self, id: &str) -> Option<&'a CatalogChain> {
        self.chains.get(id).copied()
    }

    /// The chain a store belongs to, if it exists.
    pub fn chain_of(&self, store: &CatalogStore) -> Option<&'a CatalogChain> {
        self.chain(&store.chain_id)
    }

    /// Companies operating a store's chain, omitting unknown IDs.
    pub fn companies_of(&self, store: &CatalogStore) -> Vec<&'a CatalogCompany> {
        self.chain_of(store)
            .map(|chain| {
                chain
                    .company_ids
                    .iter()
                    .filter_map(|id| self.company(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up a company by its exact display name.
    pub fn company_by_name(&self, name: &str) -> Option<&'a CatalogCompany> {
        self.catalog.companies.iter().find(|c| c.name == name)
    }
}
