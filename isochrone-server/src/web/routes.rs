//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::compute::{ComputationKey, ComputeResponse, RawComputeRequest, RequestError};
use crate::domain::{Mode, Strategy};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/compute", post(compute))
        .route("/compute/cancel", post(cancel))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Run a computation and return its record.
///
/// Failed computations are still `200 OK`; the body's `status` says how it
/// went. Only malformed requests are rejected.
async fn compute(
    State(state): State<AppState>,
    Json(req): Json<RawComputeRequest>,
) -> Result<Json<ComputeResponse>, AppError> {
    let request = req.validate(Utc::now())?;
    Ok(Json(state.engine.compute(request).await))
}

/// Cancel a running computation.
async fn cancel(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, AppError> {
    let mode = Mode::parse(&req.mode).map_err(RequestError::from)?;
    let key = ComputationKey {
        mode,
        strategy: if req.network_isochrones {
            Strategy::Network
        } else {
            Strategy::Point
        },
        station: if req.network_isochrones {
            None
        } else {
            req.input_station
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        },
    };
    let cancelled = state.engine.registry().cancel(&key);
    Ok(Json(CancelResponse { cancelled }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
}

impl From<RequestError> for AppError {
    fn from(e: RequestError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
        };

        warn!(%status, %message, "request rejected");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
