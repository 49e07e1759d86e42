//! CSV export of the catalog tables, in the column layout the catalog build reads back.

use crate::models::Catalog;

pub const COMPANY_HEADERS: [&str; 6] = ["id", "name", "ticker", "chainIds", "voucherTypes", "notes"];
pub const CHAIN_HEADERS: [&str; 7] = [
    "id",
    "displayName",
    "category",
    "companyIds",
    "voucherTypes",
    "tags",
    "url",
];
pub const STORE_HEADERS: [&str; 8] = [
    "id", "chainId", "name", "address", "lat", "lng", "tags", "updatedAt",
];

/// Which catalog table to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Companies,
    Chains,
    Stores,
}

impl CatalogTable {
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "companies.csv" => Some(CatalogTable::Companies),
            "chains.csv" => Some(CatalogTable::Chains),
            "stores.csv" => Some(CatalogTable::Stores),
            _ => None,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            CatalogTable::Companies => "companies.csv",
            CatalogTable::Chains => "chains.csv",
            CatalogTable::Stores => "stores.csv",
        }
    }
}

/// Quote a cell when it contains a quote, comma or newline.
fn escape(value: &str) -> String {
    if value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else if value.contains(',') || value.contains('\n') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

fn to_csv(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut out = headers.join(",");
    out.push('\n');
    for row in &rows {
        let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

/// Render one table of the catalog.
pub fn export_table(catalog: &Catalog, table: CatalogTable) -> String {
    match table {
        CatalogTable::Companies => to_csv(
            &COMPANY_HEADERS,
            catalog
                .companies
                .iter()
                .map(|c| {
                    vec![
                        c.id.clone(),
                        c.name.clone(),
                        c.ticker.clone().unwrap_or_default(),
                        c.chain_ids.join(","),
                        c.voucher_types.join(","),
                        c.notes.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
        CatalogTable::Chains => to_csv(
            &CHAIN_HEADERS,
            catalog
                .chains
                .iter()
                .map(|c| {
                    vec![
                        c.id.clone(),
                        c.display_name.clone(),
                        c.category.clone(),
                        c.company_ids.join(","),
                        c.voucher_types.join(","),
                        c.tags.join(","),
                        c.url.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
        CatalogTable::Stores => to_csv(
            &STORE_HEADERS,
            catalog
                .stores
                .iter()
                .map(|s| {
                    vec![
                        s.id.clone(),
                        s.chain_id.clone(),
                        s.name.clone(),
                        s.address.clone(),
                        number(s.lat),
                        number(s.lng),
                        s.tags.join(","),
                        s.updated_at.clone(),
                    ]
                })
                .collect(),
        ),
    }
}
