//! HTTP facade over the security-system creation sagas.
//!
//! Exposes REST endpoints that start a saga and hold the request open until
//! the saga resolves the caller's pending response, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use messaging::{CommandChannel, InMemoryCommandChannel};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    InMemoryCustomerService, InMemorySecuritySystemService, ReplyPump, SecuritySystemSagaService,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::security_systems::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/securitysystems", post(routes::security_systems::create))
        .route(
            "/securitysystems/sagas/{id}",
            get(routes::security_systems::saga_status),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Application state plus the in-memory collaborators behind it.
///
/// The pump is handed back unstarted so the caller decides whether replies
/// flow; the participant handles let tests seed customers and locations.
pub struct DefaultState {
    pub state: Arc<AppState>,
    pub pump: ReplyPump,
    pub customer_service: Arc<InMemoryCustomerService>,
    pub security_system_service: Arc<InMemorySecuritySystemService>,
}

/// Wires the saga service, in-memory participants and reply pump together.
pub fn create_default_state(saga_timeout: Duration) -> DefaultState {
    let channel = Arc::new(InMemoryCommandChannel::new());
    let customer_service = Arc::new(InMemoryCustomerService::new());
    let security_system_service = Arc::new(InMemorySecuritySystemService::new());

    let saga_service = Arc::new(SecuritySystemSagaService::new(
        channel.clone() as Arc<dyn CommandChannel>
    ));
    let pump = ReplyPump::new(
        channel,
        customer_service.clone(),
        security_system_service.clone(),
        saga_service.clone(),
    );

    let state = Arc::new(AppState {
        saga_service,
        saga_timeout,
    });

    DefaultState {
        state,
        pump,
        customer_service,
        security_system_service,
    }
}
