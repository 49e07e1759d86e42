//! Catalog sync: keeps the cached catalog in line with the published snapshot.
//!
//! A small manifest (`version`, `hash`, `url`) is polled first; the payload is
//! only downloaded when the manifest hash differs from the stored
//! [`CatalogMeta`] hash, or when a refresh is forced. Every failure is logged and
//! reported as [`SyncOutcome::Unavailable`]; nothing is written unless the
//! payload parsed completely.

#[cfg(test)]
pub(crate) mod fake_host;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::Config;
use crate::db::LocalStore;
use crate::errors::AppError;
use crate::models::{Catalog, CatalogManifest, CatalogMeta};

/// File name of the manifest inside a catalog directory.
pub const MANIFEST_FILE: &str = "catalog-manifest.json";

/// What a sync attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// A new payload was stored along with its hash.
    Applied { version: String, hash: String },
    /// The stored hash already matches the manifest.
    Unchanged { hash: String },
    /// No manifest could be read or a later step failed; cached data is untouched.
    Unavailable,
}

impl SyncOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, SyncOutcome::Applied { .. })
    }
}

/// Failures inside a sync attempt. Never leaves this module.
#[derive(Debug)]
enum SyncError {
    Network(reqwest::Error),
    Status { url: String, status: StatusCode },
    Parse { url: String, message: String },
    Storage(AppError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Network(e) => write!(f, "network error: {}", e),
            SyncError::Status { url, status } => write!(f, "{} returned {}", url, status),
            SyncError::Parse { url, message } => write!(f, "{} is not valid: {}", url, message),
            SyncError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err)
    }
}

impl From<AppError> for SyncError {
    fn from(err: AppError) -> Self {
        SyncError::Storage(err)
    }
}

/// Normalize the configured catalog location into a base directory.
///
/// An override may point at the directory, the manifest, or a payload file;
/// a trailing slash and a trailing `*.json` segment are removed. Without an
/// override the catalog lives at `<base_path>/catalog`.
pub fn resolve_catalog_base(override_base: Option<&str>, base_path: &str) -> String {
    let Some(raw) = override_base.map(str::trim).filter(|s| !s.is_empty()) else {
        return format!("{}/catalog", base_path.trim_end_matches('/'));
    };

    let value = raw.strip_suffix('/').unwrap_or(raw);
    let path = value.split('?').next().unwrap_or(value);
    if path.ends_with(".json") {
        if let Some(idx) = path.rfind('/') {
            return path[..idx].to_string();
        }
    }
    value.to_string()
}

/// Make a base absolute against `origin` when it is only a path.
pub fn absolutize(base: &str, origin: &str) -> String {
    if base.starts_with("http://") || base.starts_with("https://") {
        return base.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if base.starts_with('/') {
        format!("{}{}", origin, base)
    } else {
        format!("{}/{}", origin, base)
    }
}

/// Manifest URLs to try, in order: the base itself, then its `/dist` sibling.
pub fn manifest_candidates(base: &str) -> Vec<String> {
    let primary = format!("{}/{}", base, MANIFEST_FILE);
    let sibling = match base.strip_suffix("/dist") {
        Some(parent) => format!("{}/{}", parent, MANIFEST_FILE),
        None => format!("{}/dist/{}", base, MANIFEST_FILE),
    };

    let mut candidates = vec![primary];
    if !candidates.contains(&sibling) {
        candidates.push(sibling);
    }
    candidates
}

/// Payload URL relative to the directory the manifest was found in.
fn payload_url(manifest_dir: &str, manifest: &CatalogManifest) -> String {
    if manifest.url.starts_with("http://") || manifest.url.starts_with("https://") {
        manifest.url.clone()
    } else {
        format!("{}/{}", manifest_dir, manifest.url.trim_start_matches("./"))
    }
}

/// Runs the manifest/payload protocol against one configured base.
pub struct CatalogSync {
    store: LocalStore,
    client: reqwest::Client,
    base: String,
}

impl CatalogSync {
    /// Create a sync client for an absolute catalog base URL.
    pub fn new(store: LocalStore, base: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("yutai-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            store,
            client,
            base,
        })
    }

    /// Create a sync client from application configuration.
    pub fn from_config(store: LocalStore, config: &Config) -> Result<Self, AppError> {
        let base = resolve_catalog_base(config.catalog_base.as_deref(), &config.base_path);
        let base = absolutize(&base, &config.catalog_origin);
        Self::new(store, base, config.sync_timeout)
    }

    /// The resolved catalog base URL.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Run one sync attempt. Never fails; problems are logged and reported as
    /// [`SyncOutcome::Unavailable`].
    pub async fn sync(&self, force: bool) -> SyncOutcome {
        match self.try_sync(force).await {
            Ok(outcome) => {
                match &outcome {
                    SyncOutcome::Applied { version, hash } => {
                        tracing::info!("Catalog {} applied (hash {})", version, hash)
                    }
                    SyncOutcome::Unchanged { hash } => {
                        tracing::debug!("Catalog unchanged (hash {})", hash)
                    }
                    SyncOutcome::Unavailable => {
                        tracing::warn!("No catalog manifest found under {}", self.base)
                    }
                }
                outcome
            }
            Err(e) => {
                tracing::warn!("Catalog sync failed: {}", e);
                SyncOutcome::Unavailable
            }
        }
    }

    async fn try_sync(&self, force: bool) -> Result<SyncOutcome, SyncError> {
        let Some((manifest, manifest_dir)) = self.fetch_manifest().await? else {
            return Ok(SyncOutcome::Unavailable);
        };

        let meta = self.store.get_catalog_meta().await?.unwrap_or_default();
        if !force && meta.hash.as_deref() == Some(manifest.hash.as_str()) {
            return Ok(SyncOutcome::Unchanged {
                hash: manifest.hash,
            });
        }

        let url = payload_url(&manifest_dir, &manifest);
        let response = self.get_uncached(&url).await?;
        if !response.status().is_success() {
            return Err(SyncError::Status {
                url,
                status: response.status(),
            });
        }
        let body = response.text().await?;
        let catalog: Catalog = serde_json::from_str(&body).map_err(|e| SyncError::Parse {
            url: url.clone(),
            message: e.to_string(),
        })?;

        // Catalog first: a crash in between only causes a redundant re-fetch
        self.store.set_catalog(&catalog).await?;
        self.store
            .set_catalog_meta(&CatalogMeta {
                hash: Some(manifest.hash.clone()),
                fetched_at: Some(Utc::now().timestamp_millis()),
            })
            .await?;

        Ok(SyncOutcome::Applied {
            version: catalog.version,
            hash: manifest.hash,
        })
    }

    /// Find the first candidate that answers with a manifest, returning it with
    /// the directory it was found in.
    async fn fetch_manifest(&self) -> Result<Option<(CatalogManifest, String)>, SyncError> {
        for url in manifest_candidates(&self.base) {
            let response = match self.get_uncached(&url).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("Manifest candidate {} unreachable: {}", url, e);
                    continue;
                }
            };
            if !response.status().is_success() {
                tracing::debug!("Manifest candidate {} returned {}", url, response.status());
                continue;
            }

            let body = response.text().await?;
            let manifest: CatalogManifest =
                serde_json::from_str(&body).map_err(|e| SyncError::Parse {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let dir = url
                .strip_suffix(MANIFEST_FILE)
                .map(|d| d.trim_end_matches('/').to_string())
                .unwrap_or_else(|| self.base.clone());
            return Ok(Some((manifest, dir)));
        }
        Ok(None)
    }

    async fn get_uncached(&self, url: &str) -> Result<reqwest::Response, SyncError> {
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        Ok(response)
    }
}

/// Sync once now, then every `interval`.
pub fn spawn_periodic(sync: Arc<CatalogSync>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sync.sync(false).await;
        }
    })
}
