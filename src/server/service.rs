//! HTTP service: routes, handlers and request metrics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::JsonRejection;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info, warn};

use crate::guardrails::POLICY_BLOCK;
use crate::predict::Predictor;
use crate::registry::ModelRegistry;
use crate::telemetry;
use crate::types::{ErrorResponse, PredictRequest};
use crate::TriadError;

/// Header carrying the caller's e-mail address.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Shared state behind every handler.
#[derive(Debug)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub predictor: Predictor,
    pub request_timeout: Duration,
}

impl AppState {
    /// State whose predictor shares `predictor`'s registry.
    pub fn new(predictor: Predictor, request_timeout: Duration) -> Self {
        Self {
            registry: Arc::clone(predictor.registry()),
            predictor,
            request_timeout,
        }
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/model", get(model_info))
        .route("/model/reload", post(reload_model))
        .route("/predict", post(predict))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            track_requests,
        ))
        .with_state(state)
}

/// Apply the request timeout and record per-route request metrics.
async fn track_requests(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();

    let response = match tokio::time::timeout(state.request_timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(route = %route, timeout_secs = state.request_timeout.as_secs(), "request timed out");
            error_response(StatusCode::REQUEST_TIMEOUT, ErrorResponse::new("timeout"))
        }
    };

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        telemetry::HTTP_REQUESTS_TOTAL,
        "route" => route.clone(),
        "method" => method,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(telemetry::HTTP_REQUEST_DURATION_SECONDS, "route" => route)
        .record(start.elapsed().as_secs_f64());

    response
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    if state.registry.is_loaded() {
        (StatusCode::OK, Json(json!({"status": "ready"}))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready"})),
        )
            .into_response()
    }
}

async fn model_info(State(state): State<Arc<AppState>>) -> Response {
    match state.registry.get_model_info() {
        Ok(info) => Json(info).into_response(),
        Err(e) => error_for(&e),
    }
}

async fn reload_model(State(state): State<Arc<AppState>>) -> Response {
    let registry = Arc::clone(&state.registry);
    let result = tokio::task::spawn_blocking(move || registry.reload()).await;
    match result {
        Ok(Ok(snapshot)) => {
            info!(model_version = %snapshot.version, "model reloaded via API");
            Json(json!({"status": "reloaded", "model_version": snapshot.version})).into_response()
        }
        Ok(Err(e)) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e.kind()).detail(e.to_string()),
        ),
        Err(e) => {
            error!(error = %e, "reload task failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("internal_error"),
            )
        }
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let Some(email) = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new("validation_error").detail("missing X-User-Email header"),
        );
    };

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new("validation_error").detail(rejection.body_text()),
            );
        }
    };

    match state.predictor.predict(request, email).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_for(&e),
    }
}

/// Map a crate error onto a status code and error body.
fn error_for(e: &TriadError) -> Response {
    match e {
        TriadError::PolicyBlocked { request_id } => error_response(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(POLICY_BLOCK)
                .detail("Input contains disallowed content")
                .request_id(request_id.clone())
                .guardrails(vec![POLICY_BLOCK.to_string()]),
        ),
        TriadError::InvalidInput(message) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new(e.kind()).detail(message.clone()),
        ),
        TriadError::NotLoaded => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new(e.kind()).detail("Model not loaded"),
        ),
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e.kind()).detail(e.to_string()),
        ),
    }
}

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}
