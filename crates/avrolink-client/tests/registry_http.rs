//! Registry HTTP integration tests
//!
//! Spins up in-process stub registries with axum and drives the real HTTP
//! client, cache and resolver against them.

use avrolink_client::{
    HttpRegistryClient, RegistryApi, RegistryConfig, RegistryError, Schema, SchemaResolver,
    CONTENT_TYPE_V1,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const VAL_SCHEMA: &str =
    r#"{"type":"record","name":"test","fields":[{"name":"val","type":"int"}]}"#;

// ---------------------------------------------------------------
// Stub registry
// ---------------------------------------------------------------

#[derive(Default)]
struct StubState {
    hits: AtomicUsize,
    schema_by_id_hits: AtomicUsize,
    register_calls: AtomicUsize,
    registered: AtomicBool,
    last_auth: Mutex<Option<String>>,
    last_content_type: Mutex<Option<String>>,
    last_body: Mutex<Option<String>>,
    last_subject: Mutex<Option<String>>,
}

impl StubState {
    fn record(&self, headers: &HeaderMap) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        *self.last_auth.lock().unwrap() = header("authorization");
        *self.last_content_type.lock().unwrap() = header("content-type");
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

type Shared = State<Arc<StubState>>;

fn not_found(code: i32, message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error_code": code, "message": message })),
    )
        .into_response()
}

fn schema_from_body(body: &Bytes) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_slice(body).ok()?;
    parsed.get("schema")?.as_str().map(String::from)
}

async fn schema_by_id(State(state): Shared, headers: HeaderMap, Path(id): Path<u32>) -> Response {
    state.record(&headers);
    state.schema_by_id_hits.fetch_add(1, Ordering::SeqCst);
    if id == 1 {
        Json(json!({ "schema": VAL_SCHEMA })).into_response()
    } else {
        not_found(40403, "Schema not found")
    }
}

async fn list_subjects(State(state): Shared, headers: HeaderMap) -> Response {
    state.record(&headers);
    Json(json!(["test"])).into_response()
}

async fn list_versions(
    State(state): Shared,
    headers: HeaderMap,
    Path(subject): Path<String>,
) -> Response {
    state.record(&headers);
    *state.last_subject.lock().unwrap() = Some(subject);
    Json(json!([1])).into_response()
}

async fn register(
    State(state): Shared,
    headers: HeaderMap,
    Path(_subject): Path<String>,
    body: Bytes,
) -> Response {
    state.record(&headers);
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().unwrap() = Some(String::from_utf8_lossy(&body).into_owned());

    match schema_from_body(&body) {
        Some(schema) if schema == VAL_SCHEMA => {
            state.registered.store(true, Ordering::SeqCst);
            Json(json!({ "id": 1 })).into_response()
        }
        Some(_) => Json(json!({ "id": 2 })).into_response(),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error_code": 42201, "message": "Invalid schema" })),
        )
            .into_response(),
    }
}

async fn check_registered(
    State(state): Shared,
    headers: HeaderMap,
    Path(_subject): Path<String>,
    body: Bytes,
) -> Response {
    state.record(&headers);
    let known = schema_from_body(&body).as_deref() == Some(VAL_SCHEMA);
    if known && state.registered.load(Ordering::SeqCst) {
        Json(json!({ "id": 1 })).into_response()
    } else {
        not_found(40403, "Schema not found")
    }
}

async fn delete_subject(
    State(state): Shared,
    headers: HeaderMap,
    Path(_subject): Path<String>,
) -> Response {
    state.record(&headers);
    Json(json!([1])).into_response()
}

async fn schema_by_version(
    State(state): Shared,
    headers: HeaderMap,
    Path((subject, version)): Path<(String, String)>,
) -> Response {
    state.record(&headers);
    if version == "1" || version == "latest" {
        Json(json!({ "subject": subject, "version": 1, "id": 1, "schema": VAL_SCHEMA }))
            .into_response()
    } else {
        not_found(40402, "Version not found")
    }
}

async fn delete_version(
    State(state): Shared,
    headers: HeaderMap,
    Path((_subject, version)): Path<(String, u32)>,
) -> Response {
    state.record(&headers);
    Json(json!(version)).into_response()
}

fn healthy_router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/schemas/ids/:id", get(schema_by_id))
        .route("/subjects", get(list_subjects))
        .route("/subjects/:subject", post(check_registered).delete(delete_subject))
        .route("/subjects/:subject/versions", get(list_versions).post(register))
        .route(
            "/subjects/:subject/versions/:version",
            get(schema_by_version).delete(delete_version),
        )
        .with_state(state)
}

/// Answers every request with the given status and body.
fn fixed_router(state: Arc<StubState>, status: StatusCode, body: &'static str) -> Router {
    Router::new()
        .fallback(move |State(state): Shared, headers: HeaderMap| async move {
            state.record(&headers);
            (status, body).into_response()
        })
        .with_state(state)
}

/// Sleeps before answering, to trip the client timeout.
fn slow_router(state: Arc<StubState>, delay: Duration) -> Router {
    Router::new()
        .fallback(move |State(state): Shared, headers: HeaderMap| async move {
            state.record(&headers);
            tokio::time::sleep(delay).await;
            Json(json!({ "schema": VAL_SCHEMA })).into_response()
        })
        .with_state(state)
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_healthy() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    (spawn(healthy_router(state.clone())).await, state)
}

async fn spawn_failing() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let router = fixed_router(
        state.clone(),
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error_code":50001,"message":"Error in the backend data store"}"#,
    );
    (spawn(router).await, state)
}

/// Address that refuses connections.
async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn client(endpoints: Vec<String>) -> HttpRegistryClient {
    HttpRegistryClient::new(RegistryConfig::new(endpoints)).unwrap()
}

// ---------------------------------------------------------------
// Retry / failover
// ---------------------------------------------------------------

#[tokio::test]
async fn failover_reaches_the_healthy_endpoint() {
    let (bad_a, state_a) = spawn_failing().await;
    let (bad_b, state_b) = spawn_failing().await;
    let (good, state_good) = spawn_healthy().await;

    let registry = client(vec![bad_a, bad_b, good]);
    assert_eq!(registry.retries(), 3);

    for _ in 0..10 {
        let schema = registry.fetch_schema_by_id(1).await.unwrap();
        assert_eq!(schema.text(), VAL_SCHEMA);
    }

    // Every call ends at the healthy replica, after at most two failures
    assert_eq!(state_good.hits(), 10);
    assert!(state_a.hits() + state_b.hits() <= 20);
}

#[tokio::test]
async fn exhausted_retries_surface_server_error() {
    let (bad_a, state_a) = spawn_failing().await;
    let (bad_b, state_b) = spawn_failing().await;

    let registry = HttpRegistryClient::new(
        RegistryConfig::new(vec![bad_a, bad_b]).with_retries(3),
    )
    .unwrap();

    let err = registry.fetch_schema_by_id(1).await.unwrap_err();
    match err {
        RegistryError::Server {
            status,
            error_code,
            ref message,
        } => {
            assert_eq!(status, 500);
            assert_eq!(error_code, Some(50001));
            assert_eq!(message, "Error in the backend data store");
        }
        other => panic!("expected server error, got {other:?}"),
    }

    // First attempt plus three retries, alternating between the two replicas
    assert_eq!(state_a.hits() + state_b.hits(), 4);
    assert_eq!(state_a.hits(), 2);
    assert_eq!(state_b.hits(), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (a, state_a) = spawn_healthy().await;
    let (b, state_b) = spawn_healthy().await;

    let registry = client(vec![a, b]);
    let err = registry.fetch_schema_by_id(99).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.error_code(), Some(40403));
    assert_eq!(state_a.hits() + state_b.hits(), 1);
}

#[tokio::test]
async fn malformed_body_is_decode_error_and_not_retried() {
    let state_a = Arc::new(StubState::default());
    let state_b = Arc::new(StubState::default());
    let a = spawn(fixed_router(state_a.clone(), StatusCode::OK, "<html>proxy</html>")).await;
    let b = spawn(fixed_router(state_b.clone(), StatusCode::OK, "<html>proxy</html>")).await;

    let registry = client(vec![a, b]);
    let err = registry.list_subjects().await.unwrap_err();

    assert!(matches!(err, RegistryError::Decode(_)));
    assert_eq!(state_a.hits() + state_b.hits(), 1);
}

#[tokio::test]
async fn refused_connection_fails_over() {
    let dead = dead_endpoint().await;
    let (good, state_good) = spawn_healthy().await;

    let registry = client(vec![dead, good]);
    for _ in 0..5 {
        assert_eq!(registry.list_subjects().await.unwrap(), vec!["test"]);
    }
    assert_eq!(state_good.hits(), 5);
}

#[tokio::test]
async fn refused_connection_without_retries_is_transport_error() {
    let dead = dead_endpoint().await;
    let registry =
        HttpRegistryClient::new(RegistryConfig::new(vec![dead]).with_retries(0)).unwrap();

    let err = registry.list_subjects().await.unwrap_err();
    assert!(matches!(err, RegistryError::Transport { .. }));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let state = Arc::new(StubState::default());
    let slow = spawn(slow_router(state.clone(), Duration::from_secs(2))).await;

    let registry = HttpRegistryClient::new(
        RegistryConfig::new(vec![slow])
            .with_retries(0)
            .with_request_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let err = registry.fetch_schema_by_id(1).await.unwrap_err();
    assert!(matches!(err, RegistryError::Timeout { .. }));
    assert_eq!(state.hits(), 1);
}

#[tokio::test]
async fn slow_endpoint_fails_over_to_healthy() {
    let state = Arc::new(StubState::default());
    let slow = spawn(slow_router(state.clone(), Duration::from_secs(2))).await;
    let (good, _) = spawn_healthy().await;

    let registry = HttpRegistryClient::new(
        RegistryConfig::new(vec![slow, good]).with_request_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let schema = registry.fetch_schema_by_id(1).await.unwrap();
    assert_eq!(schema.text(), VAL_SCHEMA);
}

// ---------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------

#[tokio::test]
async fn requests_carry_basic_auth_and_content_type() {
    let (url, state) = spawn_healthy().await;
    let registry =
        HttpRegistryClient::new(RegistryConfig::new(vec![url]).with_basic_auth("test", "pw"))
            .unwrap();

    registry.list_subjects().await.unwrap();

    assert_eq!(
        state.last_auth.lock().unwrap().as_deref(),
        Some("Basic dGVzdDpwdw==")
    );
    assert_eq!(
        state.last_content_type.lock().unwrap().as_deref(),
        Some(CONTENT_TYPE_V1)
    );
}

#[tokio::test]
async fn requests_without_credentials_send_no_auth_header() {
    let (url, state) = spawn_healthy().await;
    let registry = client(vec![url]);

    registry.list_subjects().await.unwrap();
    assert_eq!(*state.last_auth.lock().unwrap(), None);
}

#[tokio::test]
async fn register_posts_schema_text() {
    let (url, state) = spawn_healthy().await;
    let registry = client(vec![url]);
    let schema = Schema::parse(VAL_SCHEMA).unwrap();

    assert_eq!(registry.register_schema("test", &schema).await.unwrap(), 1);

    let body: serde_json::Value =
        serde_json::from_str(state.last_body.lock().unwrap().as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({ "schema": VAL_SCHEMA }));
}

#[tokio::test]
async fn subject_with_reserved_characters_reaches_one_route() {
    let (url, state) = spawn_healthy().await;
    let registry = client(vec![format!("{}/", url)]);

    let subject = "team/orders?v=1#x y";
    assert_eq!(registry.list_versions(subject).await.unwrap(), vec![1]);
    assert_eq!(state.last_subject.lock().unwrap().as_deref(), Some(subject));
}

// ---------------------------------------------------------------
// Full operation set
// ---------------------------------------------------------------

#[tokio::test]
async fn every_registry_operation_round_trips() {
    let (url, _) = spawn_healthy().await;
    let registry = client(vec![url]);
    let schema = Schema::parse(VAL_SCHEMA).unwrap();

    assert_eq!(registry.list_subjects().await.unwrap(), vec!["test"]);
    assert_eq!(registry.list_versions("test").await.unwrap(), vec![1]);
    assert_eq!(registry.fetch_schema_by_version("test", 1).await.unwrap(), schema);
    assert_eq!(registry.fetch_latest_schema("test").await.unwrap(), schema);

    let err = registry.fetch_schema_by_version("test", 5).await.unwrap_err();
    assert_eq!(err.error_code(), Some(40402));

    let err = registry.check_registered("test", &schema).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(registry.register_schema("test", &schema).await.unwrap(), 1);
    assert_eq!(registry.register_schema("test", &schema).await.unwrap(), 1);
    assert_eq!(registry.check_registered("test", &schema).await.unwrap(), 1);

    assert_eq!(registry.delete_version("test", 1).await.unwrap(), 1);
    assert_eq!(registry.delete_subject("test").await.unwrap(), vec![1]);
}

// ---------------------------------------------------------------
// Cache + resolver over HTTP
// ---------------------------------------------------------------

#[tokio::test]
async fn resolver_round_trip_hits_registry_once_per_key() {
    let (url, state) = spawn_healthy().await;
    let resolver = SchemaResolver::new(RegistryConfig::new(vec![url])).unwrap();

    for _ in 0..3 {
        let bytes = resolver
            .encode_json_for_send("test", VAL_SCHEMA, r#"{"val":1}"#)
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[0x00, 0x00, 0x00, 0x00, 0x01, 0x02]);

        let record = resolver.decode_received(&bytes).await.unwrap();
        assert_eq!(record.schema_id, 1);
        assert_eq!(record.text, r#"{"val":1}"#);
    }

    assert_eq!(state.register_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.schema_by_id_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_found_check_does_not_block_registration() {
    let (url, state) = spawn_healthy().await;
    let resolver = SchemaResolver::new(RegistryConfig::new(vec![url])).unwrap();
    let schema = Schema::parse(VAL_SCHEMA).unwrap();
    let registry = resolver.registry();

    let err = registry.check_registered("test", &schema).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(registry.cached_id_count().await, 0);

    assert_eq!(registry.register_and_get_id("test", &schema).await.unwrap(), 1);
    assert_eq!(registry.check_registered("test", &schema).await.unwrap(), 1);
    assert_eq!(state.register_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn decode_of_unknown_id_is_not_cached() {
    let (url, state) = spawn_healthy().await;
    let resolver = SchemaResolver::new(RegistryConfig::new(vec![url])).unwrap();
    let payload = [0x00, 0x00, 0x00, 0x00, 0x07, 0x02];

    for _ in 0..2 {
        let err = resolver.decode_received(&payload).await.unwrap_err();
        assert!(err.is_not_found());
    }

    assert_eq!(state.schema_by_id_hits.load(Ordering::SeqCst), 2);
    assert_eq!(resolver.registry().cached_schema_count().await, 0);
}
