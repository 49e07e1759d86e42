//! In-process static file host standing in for the published catalog.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};

/// Serves registered JSON bodies by path and counts every request.
#[derive(Clone, Default)]
pub(crate) struct FakeCatalogHost {
    files: Arc<Mutex<HashMap<String, String>>>,
    hits: Arc<Mutex<Vec<String>>>,
    base_url: String,
}

impl FakeCatalogHost {
    pub(crate) async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");

        let host = FakeCatalogHost {
            base_url: format!("http://{}", addr),
            ..Default::default()
        };

        let app = Router::new()
            .fallback(serve_file)
            .with_state(host.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        host
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn put(&self, path: &str, body: String) {
        self.files.lock().unwrap().insert(path.to_string(), body);
    }

    pub(crate) fn hits_for(&self, path: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub(crate) fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().len()
    }
}

async fn serve_file(State(host): State<FakeCatalogHost>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    host.hits.lock().unwrap().push(path.clone());

    let body = host.files.lock().unwrap().get(&path).cloned();
    match body {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
