//! HTTP behaviour that never reaches the database.
//!
//! The pool points at a closed port and connects lazily, so every request
//! here is answered by middleware, extractors or validation.

use medrec_db_postgres::{TenantPool, create_lazy_pool};
use medrec_server::{AppConfig, build_app};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

fn offline_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.postgres.url = Some("postgres://medrec@127.0.0.1:1/medrec".into());
    config.storage.postgres.connect_timeout_ms = 300;
    config
}

async fn start_server(
    config: &AppConfig,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let pool = create_lazy_pool(&config.storage.postgres.pool_config()).expect("lazy pool");
    let tenants = TenantPool::new(pool, config.tenancy.options());
    let app = build_app(config, tenants).expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

async fn outcome(resp: reqwest::Response) -> (u16, String) {
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(content_type, "application/fhir+json");
    let body: Value = resp.json().await.expect("outcome json");
    assert_eq!(body["resourceType"], "OperationOutcome");
    let diagnostics = body["issue"][0]["diagnostics"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    (status, diagnostics)
}

#[tokio::test]
async fn health_and_request_ids() {
    let (base, shutdown_tx, handle) = start_server(&offline_config()).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let generated = resp
        .headers()
        .get("x-request-id")
        .expect("generated request id")
        .to_str()
        .unwrap()
        .to_string();
    assert!(uuid::Uuid::parse_str(&generated).is_ok());

    let resp = client
        .get(format!("{base}/healthz"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-me-123");

    let root: Value = client
        .get(format!("{base}/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["status"], "ok");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn readiness_reports_unreachable_database() {
    let (base, shutdown_tx, handle) = start_server(&offline_config()).await;

    let resp = reqwest::get(format!("{base}/readyz")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "unavailable");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn tenant_resolution_failures() {
    let (base, shutdown_tx, handle) = start_server(&offline_config()).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/patients")).send().await.unwrap();
    let (status, diagnostics) = outcome(resp).await;
    assert_eq!(status, 400);
    assert!(diagnostics.contains("x-tenant-id"));

    let resp = client
        .get(format!("{base}/patients"))
        .header("x-tenant-id", "DROP TABLE")
        .send()
        .await
        .unwrap();
    let (status, _) = outcome(resp).await;
    assert_eq!(status, 400);

    // Would share a schema with "st-marys"
    let resp = client
        .get(format!("{base}/patients"))
        .header("x-tenant-id", "st_marys")
        .send()
        .await
        .unwrap();
    let (status, _) = outcome(resp).await;
    assert_eq!(status, 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn malformed_requests_are_rejected_before_storage() {
    let mut config = offline_config();
    config.tenancy.default_tenant = Some("north-clinic".into());
    let (base, shutdown_tx, handle) = start_server(&config).await;
    let client = reqwest::Client::new();

    // Path id that is not a UUID
    let resp = client
        .get(format!("{base}/encounters/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(outcome(resp).await.0, 400);

    // Body that is not JSON
    let resp = client
        .post(format!("{base}/patients"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(outcome(resp).await.0, 400);

    // Wrong field type
    let resp = client
        .post(format!("{base}/patients"))
        .json(&json!({ "family_name": 42 }))
        .send()
        .await
        .unwrap();
    assert_eq!(outcome(resp).await.0, 400);

    // Missing required field
    let resp = client
        .post(format!("{base}/patients"))
        .json(&json!({ "given_name": "Ada" }))
        .send()
        .await
        .unwrap();
    let (status, diagnostics) = outcome(resp).await;
    assert_eq!(status, 400);
    assert_eq!(diagnostics, "family_name is required");

    // Unknown status code
    let resp = client
        .post(format!("{base}/encounters"))
        .json(&json!({
            "patient_id": uuid::Uuid::new_v4(),
            "status": "bogus"
        }))
        .send()
        .await
        .unwrap();
    let (status, diagnostics) = outcome(resp).await;
    assert_eq!(status, 400);
    assert_eq!(diagnostics, "invalid status: bogus");

    // Malformed value for a known search parameter
    let resp = client
        .get(format!("{base}/encounters?patient=nope"))
        .send()
        .await
        .unwrap();
    let (status, diagnostics) = outcome(resp).await;
    assert_eq!(status, 400);
    assert!(diagnostics.contains("patient"));

    // Negative limit
    let resp = client
        .get(format!("{base}/claims?limit=-5"))
        .send()
        .await
        .unwrap();
    assert_eq!(outcome(resp).await.0, 400);

    // Malformed FHIR id lookup
    let resp = client
        .get(format!("{base}/patients/by-fhir-id/bad%20id"))
        .send()
        .await
        .unwrap();
    assert_eq!(outcome(resp).await.0, 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn storage_failures_are_internal_errors() {
    let mut config = offline_config();
    config.tenancy.default_tenant = Some("north-clinic".into());
    let (base, shutdown_tx, handle) = start_server(&config).await;

    let resp = reqwest::get(format!("{base}/patients")).await.unwrap();
    assert_eq!(outcome(resp).await.0, 500);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn body_limit_is_enforced() {
    let mut config = offline_config();
    config.tenancy.default_tenant = Some("north-clinic".into());
    config.server.body_limit_bytes = 64;
    let (base, shutdown_tx, handle) = start_server(&config).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/patients"))
        .json(&json!({ "family_name": "x".repeat(200) }))
        .send()
        .await
        .unwrap();
    assert_eq!(outcome(resp).await.0, 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
