//! Security-system creation and saga status endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, LocationId, SagaId};
use saga::SecuritySystemSagaService;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub saga_service: Arc<SecuritySystemSagaService>,
    pub saga_timeout: Duration,
}

// -- Request types --

/// Creation request, one of two shapes.
///
/// Either `locationId` alone (create for an existing location), or
/// `customerId` plus `locationName` (create the location along the way).
/// All fields optional; shape validation happens in the handler so every
/// malformed body maps to 400.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecuritySystemRequest {
    pub location_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub location_name: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecuritySystemResponse {
    pub security_system_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaStatusResponse {
    pub saga_id: String,
    pub saga_type: String,
    pub status: String,
    pub current_step: usize,
    pub created_at: String,
}

// -- Handlers --

/// POST /securitysystems — start a creation saga and wait for its outcome.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateSecuritySystemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSecuritySystemResponse>), ApiError> {
    // Wrong-typed fields fail extraction; fold that into the same 400 as a
    // body with neither input shape.
    let Json(req) =
        payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let receiver = match (req.location_id, req.customer_id, req.location_name) {
        (Some(location_id), None, None) => {
            state
                .saga_service
                .create_security_system_with_location_id(LocationId::new(location_id))
                .await?
        }
        (None, Some(customer_id), Some(location_name)) => {
            state
                .saga_service
                .create_security_system(CustomerId::new(customer_id), location_name)
                .await?
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Expected either locationId, or customerId with locationName".to_string(),
            ));
        }
    };

    match tokio::time::timeout(state.saga_timeout, receiver).await {
        Ok(Ok(Ok(security_system_id))) => Ok((
            StatusCode::CREATED,
            Json(CreateSecuritySystemResponse {
                security_system_id: security_system_id.value(),
            }),
        )),
        Ok(Ok(Err(reason))) => Err(reason.into()),
        Ok(Err(_)) => Err(ApiError::Internal(
            "Saga dropped its response channel".to_string(),
        )),
        Err(_) => {
            metrics::counter!("creation_timeouts_total").increment(1);
            tracing::warn!("timed out waiting for security system creation");
            Err(ApiError::ServiceUnavailable(
                "Timed out waiting for security system creation".to_string(),
            ))
        }
    }
}

/// GET /securitysystems/sagas/:id — look up a saga instance by ID.
#[tracing::instrument(skip(state))]
pub async fn saga_status(
    State(state): State<Arc<AppState>>,
    Path(saga_id): Path<SagaId>,
) -> Result<Json<SagaStatusResponse>, ApiError> {
    let instance = state
        .saga_service
        .find_instance(saga_id)
        .ok_or_else(|| ApiError::NotFound(format!("Saga {saga_id} not found")))?;

    Ok(Json(SagaStatusResponse {
        saga_id: instance.id().to_string(),
        saga_type: instance.saga_type().to_string(),
        status: instance.status().to_string(),
        current_step: instance.current_step(),
        created_at: instance.created_at().to_rfc3339(),
    }))
}
