//! YutaiGO Backend
//!
//! Local store for shareholder perk holdings, with a cached store catalog kept in
//! sync with a published snapshot and whole-state JSON backup/restore.

mod api;
mod auth;
mod backup;
mod catalog;
mod config;
mod db;
mod errors;
mod models;
mod sync;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::LocalStore;
use sync::CatalogSync;

/// Catalog uploads and backups may be several megabytes.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: LocalStore,
    pub sync: Arc<CatalogSync>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting YutaiGO Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (YUTAI_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let store = LocalStore::new(pool);

    let sync = Arc::new(CatalogSync::from_config(store.clone(), &config)?);
    tracing::info!("Catalog base: {}", sync.base());

    if config.sync_interval.is_zero() {
        tracing::info!("Periodic catalog sync disabled");
    } else {
        sync::spawn_periodic(sync.clone(), config.sync_interval);
    }

    let state = AppState {
        store,
        sync,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Holdings
        .route("/holdings", get(api::list_holdings).post(api::create_holding))
        .route("/holdings/summary", get(api::holdings_summary))
        .route(
            "/holdings/{id}",
            get(api::get_holding)
                .put(api::update_holding)
                .delete(api::delete_holding),
        )
        // Catalog
        .route("/catalog", get(api::get_catalog).put(api::put_catalog))
        .route("/catalog/meta", get(api::get_catalog_meta))
        .route("/catalog/diagnostics", get(api::get_diagnostics))
        .route("/catalog/stores", get(api::query_stores).post(api::add_store))
        .route(
            "/catalog/stores/{id}",
            put(api::update_store).delete(api::delete_store),
        )
        .route("/catalog/companies", post(api::add_company))
        .route(
            "/catalog/companies/{id}",
            put(api::update_company).delete(api::delete_company),
        )
        .route("/catalog/chains", post(api::add_chain))
        .route(
            "/catalog/chains/{id}",
            put(api::update_chain).delete(api::delete_chain),
        )
        .route("/catalog/export/{file}", get(api::export_catalog_csv))
        .route("/catalog/sync", post(api::sync_catalog))
        // Backup
        .route("/backup", get(api::export_backup))
        .route("/backup/restore", post(api::restore_backup))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(move |req, next| {
            auth::require_psk(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
