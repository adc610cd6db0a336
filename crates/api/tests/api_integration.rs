//! Integration tests for the API server.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Full wiring with the reply pump running, so sagas complete.
fn setup_running() -> (axum::Router, api::DefaultState) {
    let default_state = api::create_default_state(Duration::from_secs(5));
    default_state.pump.clone().spawn();
    let app = api::create_app(default_state.state.clone(), get_metrics_handle());
    (app, default_state)
}

/// Wiring without the pump: commands queue forever and requests time out.
fn setup_stalled(saga_timeout: Duration) -> axum::Router {
    let default_state = api::create_default_state(saga_timeout);
    api::create_app(default_state.state.clone(), get_metrics_handle())
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup_running();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "security-system-orchestration");
}

#[tokio::test]
async fn test_create_with_location_id() {
    let (app, state) = setup_running();
    let customer_id = state.customer_service.register_customer();
    let location_id = state.customer_service.register_location(customer_id, "Warehouse");

    let response = app
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({ "locationId": location_id.value() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["securitySystemId"].as_i64().unwrap() > 0);
    assert_eq!(state.security_system_service.system_count(), 1);
}

#[tokio::test]
async fn test_unknown_location_returns_not_found() {
    let (app, _) = setup_running();

    let response = app
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({ "locationId": 99 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Location not found");
}

#[tokio::test]
async fn test_occupied_location_returns_conflict() {
    let (app, state) = setup_running();
    let customer_id = state.customer_service.register_customer();
    let location_id = state.customer_service.register_location(customer_id, "Warehouse");
    state.security_system_service.mark_location_occupied(location_id);

    let response = app
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({ "locationId": location_id.value() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Location already has a security system");
}

#[tokio::test]
async fn test_create_with_customer_id() {
    let (app, state) = setup_running();
    let customer_id = state.customer_service.register_customer();

    let response = app
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({
                "customerId": customer_id.value(),
                "locationName": "Warehouse"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["securitySystemId"].as_i64().is_some());
}

#[tokio::test]
async fn test_malformed_body_returns_bad_request() {
    let (app, _) = setup_running();

    // Neither shape: locationId together with customerId.
    let response = app
        .clone()
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({ "locationId": 1, "customerId": 2, "locationName": "X" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/securitysystems", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_type_mismatched_body_returns_bad_request() {
    let (app, _) = setup_running();

    // A string where a number belongs fails deserialization, which must
    // surface as 400 like any other malformed body.
    let response = app
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({ "locationId": "abc" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_saga_status_endpoint() {
    let (app, state) = setup_running();
    let customer_id = state.customer_service.register_customer();
    let location_id = state.customer_service.register_location(customer_id, "Warehouse");

    let response = app
        .clone()
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({ "locationId": location_id.value() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let saga_id = state
        .state
        .saga_service
        .with_location_id_orchestrator()
        .instance_ids()[0];

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/securitysystems/sagas/{saga_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Completed");
    assert_eq!(json["sagaType"], "CreateSecuritySystemWithLocationId");
    assert_eq!(json["sagaId"], saga_id.to_string());
}

#[tokio::test]
async fn test_unknown_saga_returns_not_found() {
    let (app, _) = setup_running();
    let fake_id = common::SagaId::new();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/securitysystems/sagas/{fake_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stalled_saga_returns_service_unavailable() {
    // No pump, so the saga never resolves and the request deadline fires.
    let app = setup_stalled(Duration::from_millis(100));

    let response = app
        .oneshot(post_json(
            "/securitysystems",
            serde_json::json!({ "locationId": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "Timed out waiting for security system creation"
    );
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _) = setup_running();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
