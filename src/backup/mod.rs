//! Backup and destructive restore of the whole local store.

use crate::db::LocalStore;
use crate::errors::AppError;
use crate::models::{BackupDocument, BackupPayload};

/// Caller choices for a restore.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Proceed with a document that carries no `schemaVersion`.
    pub confirm_unversioned: bool,
}

/// What a restore wrote.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub schema_version: Option<i64>,
    pub holdings: usize,
    pub catalog: bool,
    pub catalog_meta: bool,
}

/// Snapshot holdings, catalog and catalog metadata into a versioned document.
pub async fn export(store: &LocalStore) -> Result<BackupDocument, AppError> {
    let holdings = store.list_holdings().await?;
    let catalog = store.get_catalog().await?;
    let catalog_meta = store.get_catalog_meta().await?;

    tracing::info!("Exporting backup with {} holdings", holdings.len());

    Ok(BackupDocument::V1(BackupPayload {
        holdings,
        catalog,
        catalog_meta,
    }))
}

/// Decode a backup and decide whether it may be restored, before anything is cleared.
pub fn prepare(text: &str, options: RestoreOptions) -> Result<BackupDocument, AppError> {
    let document = BackupDocument::from_json(text)?;

    if let BackupDocument::Unversioned(_) = document {
        if !options.confirm_unversioned {
            return Err(AppError::ConfirmationRequired(
                "Backup has no schemaVersion; confirm to restore it anyway".to_string(),
            ));
        }
        tracing::warn!("Restoring a backup without schemaVersion");
    }

    Ok(document)
}

/// Replace the entire local store with the document's contents.
///
/// Clears first, then inserts holdings one by one, then the catalog and its
/// metadata. There is no rollback if a later step fails.
pub async fn restore(store: &LocalStore, document: BackupDocument) -> Result<RestoreReport, AppError> {
    let schema_version = document.schema_version();
    let payload = document.into_payload();

    store.clear_all().await?;

    let holdings = payload.holdings;
    for holding in &holdings {
        store.put_holding(holding).await?;
    }
    if let Some(catalog) = &payload.catalog {
        store.set_catalog(catalog).await?;
    }
    if let Some(meta) = &payload.catalog_meta {
        store.set_catalog_meta(meta).await?;
    }

    let report = RestoreReport {
        schema_version,
        holdings: holdings.len(),
        catalog: payload.catalog.is_some(),
        catalog_meta: payload.catalog_meta.is_some(),
    };
    tracing::info!("Restored backup: {:?}", report);
    Ok(report)
}

/// Parse, check and restore in one step.
pub async fn import_json(
    store: &LocalStore,
    text: &str,
    options: RestoreOptions,
) -> Result<RestoreReport, AppError> {
    let document = prepare(text, options)?;
    restore(store, document).await
}
