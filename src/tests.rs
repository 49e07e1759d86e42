//! Integration tests for the YutaiGO backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::catalog::tests::sample_catalog;
use crate::config::Config;
use crate::db::{init_database, LocalStore};
use crate::models::VoucherTypes;
use crate::sync::fake_host::FakeCatalogHost;
use crate::sync::CatalogSync;
use crate::{create_router, AppState};

/// Nothing listens on the discard port.
const UNREACHABLE_BASE: &str = "http://127.0.0.1:9/catalog";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::start(Some("test-api-key".to_string()), UNREACHABLE_BASE.to_string()).await
    }

    async fn with_catalog_base(base: String) -> Self {
        Self::start(Some("test-api-key".to_string()), base).await
    }

    async fn start(psk: Option<String>, catalog_base: String) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let store = LocalStore::new(pool);

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            catalog_base: Some(catalog_base.clone()),
            base_path: String::new(),
            catalog_origin: "http://127.0.0.1".to_string(),
            sync_interval: Duration::ZERO,
            sync_timeout: Duration::from_secs(2),
            voucher_types: VoucherTypes::default(),
        };

        let sync = CatalogSync::new(store.clone(), catalog_base, config.sync_timeout)
            .expect("Failed to build sync client");

        let state = AppState {
            store,
            sync: Arc::new(sync),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Value {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "GET {}", path);
        resp.json().await.unwrap()
    }

    async fn create_holding(&self, body: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/holdings"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn put_sample_catalog(&self) -> Value {
        let resp = self
            .client
            .put(self.url("/api/catalog"))
            .json(&sample_catalog())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }
}

fn days_from_today(days: i64) -> String {
    (Local::now().date_naive() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

fn holding_body(company: &str, expiry: &str) -> Value {
    json!({
        "companyName": company,
        "voucherType": "食事",
        "expiry": expiry,
        "amount": 1000,
        "count": 2
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    // Request without API key
    let resp = Client::new()
        .get(fixture.url("/api/holdings"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/holdings"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_bearer_token() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/holdings"))
        .bearer_auth("test-api-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_auth_disabled_without_psk() {
    let fixture = TestFixture::start(None, UNREACHABLE_BASE.to_string()).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/holdings"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_holding_crud() {
    let fixture = TestFixture::new().await;

    // Empty store
    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["success"], true);
    assert_eq!(list["data"], json!([]));

    // Create
    let created = fixture
        .create_holding(holding_body("Alpha Holdings", "2031-03-31"))
        .await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["companyName"], "Alpha Holdings");
    assert_eq!(created["voucherType"], "食事");
    let created_at = created["createdAt"].as_i64().unwrap();

    // Get
    let fetched = fixture.get_json(&format!("/api/holdings/{}", id)).await;
    assert_eq!(fetched["data"], created);

    // Update keeps createdAt
    tokio::time::sleep(Duration::from_millis(5)).await;
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/holdings/{}", id)))
        .json(&json!({
            "companyName": "Alpha Holdings",
            "voucherType": "買い物",
            "expiry": "2031-06-30",
            "note": "renewed"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let updated: Value = update_resp.json().await.unwrap();
    assert_eq!(updated["data"]["id"], id.as_str());
    assert_eq!(updated["data"]["voucherType"], "買い物");
    assert_eq!(updated["data"]["note"], "renewed");
    assert_eq!(updated["data"]["createdAt"].as_i64().unwrap(), created_at);
    assert!(updated["data"]["updatedAt"].as_i64().unwrap() >= created_at);

    // Still one holding
    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    // Delete, twice
    for _ in 0..2 {
        let resp = fixture
            .client
            .delete(fixture.url(&format!("/api/holdings/{}", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/holdings/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_holdings_listed_by_expiry() {
    let fixture = TestFixture::new().await;

    for (company, expiry) in [("C", "2032-01-01"), ("A", "2030-01-01"), ("B", "2031-01-01")] {
        fixture.create_holding(holding_body(company, expiry)).await;
    }

    let list = fixture.get_json("/api/holdings").await;
    let names: Vec<&str> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["companyName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_holding_validation_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/holdings"))
        .json(&json!({
            "companyName": "  ",
            "voucherType": "宝くじ",
            "expiry": "31/03/2031",
            "amount": -5
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let fields: Vec<&str> = body["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"companyName"));
    assert!(fields.contains(&"voucherType"));
    assert!(fields.contains(&"expiry"));
    assert!(fields.contains(&"amount"));

    // Nothing was written
    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["data"], json!([]));
}

#[tokio::test]
async fn test_malformed_holding_body_uses_error_envelope() {
    let fixture = TestFixture::new().await;

    // Wrongly typed field
    let resp = fixture
        .client
        .post(fixture.url("/api/holdings"))
        .json(&json!({
            "companyName": "Alpha Holdings",
            "voucherType": "食事",
            "expiry": "2031-03-31",
            "count": 1.5
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "count");

    // Not JSON at all
    let resp = fixture
        .client
        .put(fixture.url("/api/holdings/h-1"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Unpadded date
    let resp = fixture
        .client
        .post(fixture.url("/api/holdings"))
        .json(&holding_body("Alpha Holdings", "2031-3-5"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "expiry");

    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["data"], json!([]));
}

#[tokio::test]
async fn test_company_id_resolved_from_catalog() {
    let fixture = TestFixture::new().await;
    fixture.put_sample_catalog().await;

    let resolved = fixture
        .create_holding(holding_body("Beta Foods", "2031-03-31"))
        .await;
    assert_eq!(resolved["companyId"], "2222");

    let explicit = fixture
        .create_holding(json!({
            "companyId": "9999",
            "companyName": "Beta Foods",
            "voucherType": "食事",
            "expiry": "2031-03-31"
        }))
        .await;
    assert_eq!(explicit["companyId"], "9999");

    let unknown = fixture
        .create_holding(holding_body("Unlisted Corp", "2031-03-31"))
        .await;
    assert_eq!(unknown["companyId"], "");
}

#[tokio::test]
async fn test_holdings_summary() {
    let fixture = TestFixture::new().await;

    fixture.create_holding(holding_body("Expired", &days_from_today(-1))).await;
    fixture.create_holding(holding_body("Urgent", &days_from_today(10))).await;
    fixture.create_holding(holding_body("Soon", &days_from_today(60))).await;
    fixture.create_holding(holding_body("Later", &days_from_today(200))).await;

    let summary = fixture.get_json("/api/holdings/summary").await;
    assert_eq!(summary["data"]["total"], 4);
    assert_eq!(summary["data"]["expired"], 1);
    assert_eq!(summary["data"]["urgent"], 1);
    assert_eq!(summary["data"]["soon"], 1);

    let this_month = Local::now().format("%Y-%m").to_string();
    let expected = [-1, 10, 60, 200]
        .iter()
        .filter(|d| days_from_today(**d).starts_with(&this_month))
        .count();
    assert_eq!(summary["data"]["expiringThisMonth"], expected);
}

#[tokio::test]
async fn test_catalog_starts_empty() {
    let fixture = TestFixture::new().await;

    let catalog = fixture.get_json("/api/catalog").await;
    assert_eq!(catalog["data"], Value::Null);

    let meta = fixture.get_json("/api/catalog/meta").await;
    assert_eq!(meta["data"], Value::Null);

    let diagnostics = fixture.get_json("/api/catalog/diagnostics").await;
    assert_eq!(diagnostics["data"], json!([]));

    let stores = fixture.get_json("/api/catalog/stores").await;
    assert_eq!(stores["data"]["total"], 0);

    let resp = fixture
        .client
        .get(fixture.url("/api/catalog/export/stores.csv"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_catalog_with_dangling_references_is_stored() {
    let fixture = TestFixture::new().await;

    let mut catalog = serde_json::to_value(sample_catalog()).unwrap();
    catalog["stores"][0]["chainId"] = json!("chain-missing");
    catalog["stores"][1]["lat"] = Value::Null;
    catalog["chains"][0]["companyIds"] = json!(["c-missing"]);

    let resp = fixture
        .client
        .put(fixture.url("/api/catalog"))
        .json(&catalog)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"unknownChain"));
    assert!(kinds.contains(&"unknownCompany"));
    assert!(kinds.contains(&"nonFiniteCoordinate"));

    // The catalog was written anyway
    let stored = fixture.get_json("/api/catalog").await;
    assert_eq!(stored["data"]["stores"][0]["chainId"], "chain-missing");

    let diagnostics = fixture.get_json("/api/catalog/diagnostics").await;
    assert_eq!(diagnostics["data"], body["data"]);

    // Manual saves do not touch sync metadata
    let meta = fixture.get_json("/api/catalog/meta").await;
    assert_eq!(meta["data"], Value::Null);
}

#[tokio::test]
async fn test_catalog_edits_require_a_catalog() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/catalog/companies"))
        .json(&json!({ "id": "c-new", "name": "New Co" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let catalog = fixture.get_json("/api/catalog").await;
    assert_eq!(catalog["data"], Value::Null);
}

#[tokio::test]
async fn test_catalog_entity_edits() {
    let fixture = TestFixture::new().await;
    fixture.put_sample_catalog().await;

    // Add a company, then a chain under it, then a store in that chain
    let resp = fixture
        .client
        .post(fixture.url("/api/catalog/companies"))
        .json(&json!({ "id": "c-gamma", "name": "Gamma Corp", "ticker": "3333" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .post(fixture.url("/api/catalog/chains"))
        .json(&json!({ "id": "chain-ramen", "displayName": "Gamma Ramen", "companyIds": ["c-gamma"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["category"], "その他");

    let resp = fixture
        .client
        .post(fixture.url("/api/catalog/stores"))
        .json(&json!({
            "id": "store-ramen-1",
            "chainId": "chain-ramen",
            "name": "Gamma Ramen Ueno",
            "lat": "35.7138",
            "lng": 139.7774
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Duplicate id
    let resp = fixture
        .client
        .post(fixture.url("/api/catalog/companies"))
        .json(&json!({ "id": "c-gamma", "name": "Again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "id");

    // Bad coordinate leaves the store alone
    let resp = fixture
        .client
        .put(fixture.url("/api/catalog/stores/store-ramen-1"))
        .json(&json!({ "name": "Gamma Ramen Ueno", "lat": "north", "lng": 139.7774 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "lat");

    let resp = fixture
        .client
        .put(fixture.url("/api/catalog/stores/store-missing"))
        .json(&json!({ "name": "Nowhere", "lat": 1, "lng": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let stored = fixture.get_json("/api/catalog").await;
    assert_eq!(stored["data"]["stores"][3]["lat"], 35.7138);
    assert_eq!(stored["data"]["stores"].as_array().unwrap().len(), 4);

    // Deleting a company detaches it from chains
    let deleted = fixture
        .client
        .delete(fixture.url("/api/catalog/companies/c-alpha"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    let body: Value = deleted.json().await.unwrap();
    assert_eq!(body["data"]["chainsDetached"], 2);

    // Deleting a chain removes its stores
    let deleted = fixture
        .client
        .delete(fixture.url("/api/catalog/chains/chain-cafe"))
        .send()
        .await
        .unwrap();
    let body: Value = deleted.json().await.unwrap();
    assert_eq!(body["data"]["storesRemoved"], 2);

    let stored = fixture.get_json("/api/catalog").await;
    let store_ids: Vec<&str> = stored["data"]["stores"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(store_ids, vec!["store-3", "store-ramen-1"]);
    assert_eq!(stored["data"]["chains"][0]["companyIds"], json!(["c-beta"]));

    // Deleting again is not an error
    let deleted = fixture
        .client
        .delete(fixture.url("/api/catalog/chains/chain-cafe"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    let body: Value = deleted.json().await.unwrap();
    assert_eq!(body["data"]["removed"], false);

    let diagnostics = fixture.get_json("/api/catalog/diagnostics").await;
    assert_eq!(diagnostics["data"], json!([]));
}

#[tokio::test]
async fn test_store_queries() {
    let fixture = TestFixture::new().await;
    let saved = fixture.put_sample_catalog().await;
    assert_eq!(saved["data"], json!([]));

    let all = fixture.get_json("/api/catalog/stores").await;
    assert_eq!(all["data"]["total"], 3);

    let cafe = fixture.get_json("/api/catalog/stores?chainId=chain-cafe").await;
    assert_eq!(cafe["data"]["total"], 2);
    assert_eq!(cafe["data"]["stores"][0]["chainName"], "Alpha Cafe");

    let by_company = fixture.get_json("/api/catalog/stores?companyId=c-beta").await;
    assert_eq!(by_company["data"]["total"], 1);
    assert_eq!(by_company["data"]["stores"][0]["store"]["id"], "store-3");

    let osaka = fixture
        .get_json(&format!("/api/catalog/stores?q={}", "大阪"))
        .await;
    assert_eq!(osaka["data"]["total"], 1);

    // Shinjuku station, 3 km
    let near = fixture
        .get_json("/api/catalog/stores?lat=35.6896&lng=139.7006&radiusKm=3")
        .await;
    assert_eq!(near["data"]["total"], 1);
    assert_eq!(near["data"]["stores"][0]["store"]["id"], "store-1");
    assert!(near["data"]["stores"][0]["distanceKm"].as_f64().unwrap() < 1.0);

    let limited = fixture.get_json("/api/catalog/stores?limit=1").await;
    assert_eq!(limited["data"]["total"], 3);
    assert_eq!(limited["data"]["stores"].as_array().unwrap().len(), 1);

    // Partial geo filter
    let resp = fixture
        .client
        .get(fixture.url("/api/catalog/stores?lat=35.6"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_catalog_csv_export() {
    let fixture = TestFixture::new().await;
    fixture.put_sample_catalog().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/catalog/export/companies.csv"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("companies.csv"));

    let text = resp.text().await.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,name,ticker,chainIds,voucherTypes,notes");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("c-alpha,Alpha Holdings,1111"));

    let resp = fixture
        .client
        .get(fixture.url("/api/catalog/export/holdings.csv"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_catalog_sync_applies_then_short_circuits() {
    let host = FakeCatalogHost::start().await;
    host.put(
        "/catalog/catalog-manifest.json",
        json!({ "version": "2024-01-02", "hash": "abc123", "url": "catalog.json" }).to_string(),
    );
    host.put(
        "/catalog/catalog.json",
        serde_json::to_string(&sample_catalog()).unwrap(),
    );

    let fixture = TestFixture::with_catalog_base(host.url("/catalog")).await;

    let sync = |force: bool| {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/catalog/sync?force={}", force));
        async move {
            let resp = client.post(url).send().await.unwrap();
            assert_eq!(resp.status(), 200);
            resp.json::<Value>().await.unwrap()
        }
    };

    let first = sync(false).await;
    assert_eq!(first["data"]["updated"], true);
    assert_eq!(first["data"]["outcome"]["status"], "applied");
    assert_eq!(first["data"]["outcome"]["hash"], "abc123");

    let meta = fixture.get_json("/api/catalog/meta").await;
    assert_eq!(meta["data"]["hash"], "abc123");
    assert!(meta["data"]["fetchedAt"].is_number());

    let catalog = fixture.get_json("/api/catalog").await;
    assert_eq!(catalog["data"]["stores"].as_array().unwrap().len(), 3);

    // Same hash: the payload is not fetched again
    let second = sync(false).await;
    assert_eq!(second["data"]["updated"], false);
    assert_eq!(second["data"]["outcome"]["status"], "unchanged");
    assert_eq!(host.hits_for("/catalog/catalog.json"), 1);

    let forced = sync(true).await;
    assert_eq!(forced["data"]["updated"], true);
    assert_eq!(host.hits_for("/catalog/catalog.json"), 2);
}

#[tokio::test]
async fn test_catalog_sync_unavailable_keeps_cache() {
    let fixture = TestFixture::new().await;
    fixture.put_sample_catalog().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/catalog/sync"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["updated"], false);
    assert_eq!(body["data"]["outcome"]["status"], "unavailable");

    let catalog = fixture.get_json("/api/catalog").await;
    assert_eq!(catalog["data"]["version"], "2024-01-02");
}

#[tokio::test]
async fn test_backup_round_trip() {
    let fixture = TestFixture::new().await;
    fixture.put_sample_catalog().await;
    let kept = fixture
        .create_holding(holding_body("Alpha Holdings", "2031-03-31"))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/backup"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("yutai-backup-"));
    assert!(disposition.ends_with(".json\""));
    let backup = resp.text().await.unwrap();
    let document: Value = serde_json::from_str(&backup).unwrap();
    assert_eq!(document["schemaVersion"], 1);
    assert_eq!(document["holdings"].as_array().unwrap().len(), 1);

    // Changes after the backup are discarded by the restore
    fixture
        .create_holding(holding_body("Beta Foods", "2030-01-01"))
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore"))
        .body(backup)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["data"]["schemaVersion"], 1);
    assert_eq!(report["data"]["holdings"], 1);
    assert_eq!(report["data"]["catalog"], true);

    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["data"], json!([kept]));
}

#[tokio::test]
async fn test_restore_unversioned_requires_confirmation() {
    let fixture = TestFixture::new().await;
    let existing = fixture
        .create_holding(holding_body("Alpha Holdings", "2031-03-31"))
        .await;

    let legacy = json!({ "holdings": [] }).to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore"))
        .body(legacy.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFIRMATION_REQUIRED");

    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["data"], json!([existing]));

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore?confirm=true"))
        .body(legacy)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["schemaVersion"], Value::Null);

    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["data"], json!([]));
}

#[tokio::test]
async fn test_restore_corrupt_backup_is_rejected() {
    let fixture = TestFixture::new().await;
    fixture
        .create_holding(holding_body("Alpha Holdings", "2031-03-31"))
        .await;

    for bad in [
        "not json",
        "[1, 2]",
        r#"{"schemaVersion": 7}"#,
        r#"{"schemaVersion": 1, "holdings": "x"}"#,
        r#"{"schemaVersion": 1}"#,
        r#"{"schemaVersion": 1, "holdngs": []}"#,
    ] {
        let resp = fixture
            .client
            .post(fixture.url("/api/backup/restore?confirm=true"))
            .body(bad)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body {}", bad);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "RESTORE_CORRUPTION");
    }

    let list = fixture.get_json("/api/holdings").await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}
