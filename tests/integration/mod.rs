//! Integration tests for the frontend/backend pair.
//!
//! Each test starts real axum servers on ephemeral localhost ports and
//! drives the frontend router against them, so the bounded client makes
//! genuine HTTP calls.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use appstack::api::{create_backend_router, create_frontend_router, BackendState, FrontendState};
use appstack::db::{self, DatabaseConfig, MockDatabaseProbe};
use appstack::config::Config;
use appstack::remote::BoundedClient;
use appstack::secrets::{
    IdentityEndpoint, KeyVaultClient, ManagedIdentityCredential, SecretSource, SecretStore,
};
use axum::body::{to_bytes, Body};
use axum::extract::Query;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

/// Serve `router` on an ephemeral port and return its address.
async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn frontend_for(addr: SocketAddr, timeout: Duration) -> Router {
    let client = BoundedClient::new(&format!("http://{}", addr), timeout).unwrap();
    create_frontend_router(FrontendState::new(client))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn unconfigured_backend() -> Router {
    create_backend_router(BackendState::new(
        DatabaseConfig::Unconfigured,
        Arc::new(MockDatabaseProbe::healthy()),
    ))
}

#[tokio::test]
async fn backend_health_is_nested_verbatim_on_success() {
    let backend = spawn(unconfigured_backend()).await;
    let frontend = frontend_for(backend, Duration::from_secs(10));

    let (status, body) = get_json(frontend, "/api/backend-health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connectivity"], "success");
    assert_eq!(body["backend"]["status"], "healthy");
    assert_eq!(body["backend"]["app"], "app2-backend");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn data_is_forwarded_from_backend() {
    let backend = spawn(unconfigured_backend()).await;
    let frontend = frontend_for(backend, Duration::from_secs(10));

    let (status, body) = get_json(frontend, "/api/data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "app1-frontend");
    assert_eq!(body["backendData"]["message"], "Data from backend API");
    assert_eq!(body["backendData"]["data"]["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn hung_backend_fails_within_deadline() {
    let slow = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"status": "healthy"}))
        }),
    );
    let backend = spawn(slow).await;
    let frontend = frontend_for(backend, Duration::from_millis(300));

    let start = Instant::now();
    let (status, body) = get_json(frontend, "/api/backend-health").await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["connectivity"], "failed");
    assert_eq!(body["error"], "timeout of 300ms exceeded");
    assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
}

#[tokio::test]
async fn non_2xx_backend_is_unhealthy() {
    let failing = Router::new().route(
        "/health",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let backend = spawn(failing).await;
    let frontend = frontend_for(backend, Duration::from_secs(10));

    let (status, body) = get_json(frontend.clone(), "/api/backend-health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "request failed with status code 500");

    let (status, body) = get_json(frontend, "/api/data").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Failed to fetch data from backend"}));
}

#[tokio::test]
async fn non_json_backend_body_is_passed_as_text() {
    let plain = Router::new().route("/health", get(|| async { "OK" }));
    let backend = spawn(plain).await;
    let frontend = frontend_for(backend, Duration::from_secs(10));

    let (status, body) = get_json(frontend, "/api/backend-health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "OK");
}

/// Stub identity endpoint plus Key Vault, counting secret reads.
fn stub_vault(secret: Option<&'static str>, reads: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/token",
            get(|headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                if headers.get("Metadata").map(|v| v == "true") != Some(true) {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                assert_eq!(q.get("resource").map(String::as_str), Some("https://vault.azure.net"));
                Json(json!({"access_token": "test-token", "expires_in": "3600"})).into_response()
            }),
        )
        .route(
            "/secrets/sql-connection-string",
            get(move |headers: HeaderMap| {
                let reads = reads.clone();
                async move {
                    reads.fetch_add(1, Ordering::SeqCst);
                    let authorized = headers
                        .get("authorization")
                        .map(|v| v == "Bearer test-token")
                        .unwrap_or(false);
                    if !authorized {
                        return StatusCode::UNAUTHORIZED.into_response();
                    }
                    match secret {
                        Some(value) => Json(json!({"value": value, "id": "x"})).into_response(),
                        None => StatusCode::FORBIDDEN.into_response(),
                    }
                }
            }),
        )
}

fn vault_client(addr: SocketAddr) -> Arc<dyn SecretStore> {
    let http = reqwest::Client::new();
    let credential = Arc::new(ManagedIdentityCredential::with_endpoint(
        http.clone(),
        IdentityEndpoint::Imds {
            url: format!("http://{}/token", addr),
        },
        None,
    ));
    let url = Url::parse(&format!("http://{}", addr)).unwrap();
    Arc::new(KeyVaultClient::with_url(http, url, credential))
}

#[tokio::test]
async fn connection_string_is_resolved_from_vault() {
    let reads = Arc::new(AtomicUsize::new(0));
    let addr = spawn(stub_vault(
        Some("Server=tcp:vault-sql.example.net,1433;Database=inventory;Encrypt=True"),
        reads.clone(),
    ))
    .await;

    let config = db::resolve(SecretSource::select(None, Some(vault_client(addr)))).await;

    let descriptor = config.descriptor().expect("descriptor from vault");
    assert_eq!(descriptor.server.as_deref(), Some("vault-sql.example.net"));
    assert_eq!(descriptor.database.as_deref(), Some("inventory"));
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn explicit_string_short_circuits_vault() {
    let reads = Arc::new(AtomicUsize::new(0));
    let addr = spawn(stub_vault(Some("Server=ignored"), reads.clone())).await;

    let config = db::resolve(SecretSource::select(
        Some("Server=explicit;Database=db"),
        Some(vault_client(addr)),
    ))
    .await;

    assert_eq!(
        config.descriptor().and_then(|d| d.server.as_deref()),
        Some("explicit")
    );
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn vault_denial_leaves_db_status_not_configured() {
    let reads = Arc::new(AtomicUsize::new(0));
    let addr = spawn(stub_vault(None, reads.clone())).await;

    let database = db::resolve(SecretSource::select(None, Some(vault_client(addr)))).await;
    assert_eq!(database, DatabaseConfig::Unconfigured);
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    let probe = MockDatabaseProbe::healthy();
    let backend = create_backend_router(BackendState::new(database, Arc::new(probe.clone())));

    let (status, body) = get_json(backend, "/api/db-status").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_configured");
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn backend_with_malformed_vault_name_starts_unconfigured() {
    let config = Config {
        key_vault_name: Some("1vault".to_string()),
        backend_api_url: "not a url".to_string(),
        ..Config::default()
    };
    assert!(config.validate_backend().is_ok());

    let source = SecretSource::from_config(&config, &reqwest::Client::new());
    assert_eq!(source.kind(), "absent");
    let database = db::resolve(source).await;
    assert_eq!(database, DatabaseConfig::Unconfigured);

    let probe = MockDatabaseProbe::healthy();
    let backend = spawn(create_backend_router(BackendState::new(
        database,
        Arc::new(probe.clone()),
    )))
    .await;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("http://{}/health", backend))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status().as_u16(), 200);

    let status = client
        .get(format!("http://{}/api/db-status", backend))
        .send()
        .await
        .unwrap();
    assert_eq!(status.status().as_u16(), 503);
    let body: Value = status.json().await.unwrap();
    assert_eq!(body["status"], "not_configured");
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn malformed_vault_name_keeps_explicit_string() {
    let config = Config {
        key_vault_name: Some("my-vault-name-that-is-25x".to_string()),
        sql_connection_string: Some("Server=tcp:h,1433;Database=d".to_string()),
        ..Config::default()
    };

    let database = db::resolve(SecretSource::from_config(&config, &reqwest::Client::new())).await;

    let descriptor = database.descriptor().expect("explicit string is used");
    assert_eq!(descriptor.server.as_deref(), Some("h"));
    assert_eq!(descriptor.database.as_deref(), Some("d"));
}

#[tokio::test]
async fn rejected_request_does_not_affect_later_requests() {
    let backend = spawn(unconfigured_backend()).await;
    let client = reqwest::Client::new();

    let bad = client
        .post(format!("http://{}/api/data", backend))
        .header("content-type", "application/json")
        .body("{")
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 400);

    let ok = client
        .get(format!("http://{}/health", backend))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);
}
