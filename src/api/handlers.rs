use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::AlertConfig;
use crate::downsample::sieve_evenly;
use crate::store::{Reading, Store};

pub const DEFAULT_POINTS: usize = 500;
pub const MAX_POINTS: usize = 10_000;
const DEFAULT_WINDOW_SECS: i64 = 24 * 3600;

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Readings
// ============================================================================

pub async fn latest(State(state): State<Arc<AppState>>) -> Result<Json<Reading>, ApiError> {
    let reading = state
        .store
        .latest_reading()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("no data".to_string()))?;

    Ok(Json(reading))
}

#[derive(Deserialize)]
pub struct DataParams {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub points: Option<usize>,
}

#[derive(Serialize)]
pub struct DataResponse {
    pub data: Vec<Reading>,
}

pub async fn data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DataParams>,
) -> Result<Json<DataResponse>, ApiError> {
    let now = chrono::Utc::now().timestamp();
    let end = params.end.unwrap_or(now);
    let start = params.start.unwrap_or(end - DEFAULT_WINDOW_SECS);
    if start > end {
        return Err(ApiError::BadRequest("start must be <= end".to_string()));
    }

    let points = params.points.unwrap_or(DEFAULT_POINTS).clamp(1, MAX_POINTS);

    let rows = state
        .store
        .readings_in_range(start, end)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(DataResponse {
        data: sieve_evenly(rows, points),
    }))
}

// ============================================================================
// Alert Config
// ============================================================================

pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<Json<AlertConfig>, ApiError> {
    let config = state
        .store
        .ensure_alert_config()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(config))
}

pub async fn put_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<AlertConfig>,
) -> Result<Json<AlertConfig>, ApiError> {
    config
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .store
        .persist_alert_config(&config)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let resolved = state
        .store
        .ensure_alert_config()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(resolved))
}

// ============================================================================
// Subscriptions
// ============================================================================

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub credentials: String,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub created: bool,
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let endpoint = request.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ApiError::BadRequest("endpoint must not be empty".to_string()));
    }
    if !endpoint.starts_with("https://") {
        return Err(ApiError::BadRequest("endpoint must use https".to_string()));
    }
    if request.credentials.trim().is_empty() {
        return Err(ApiError::BadRequest("credentials must not be empty".to_string()));
    }

    let created = state
        .store
        .add_subscription(endpoint, &request.credentials)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(SubscribeResponse { created }))
}

#[derive(Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Serialize)]
pub struct UnsubscribeResponse {
    pub deleted: bool,
}

pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    let deleted = state
        .store
        .remove_subscription(request.endpoint.trim())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(UnsubscribeResponse { deleted }))
}

#[derive(Serialize)]
pub struct SubscriptionCountResponse {
    pub count: i64,
}

/// Count only; credentials are never disclosed.
pub async fn subscription_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SubscriptionCountResponse>, ApiError> {
    let count = state
        .store
        .count_subscriptions()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(SubscriptionCountResponse { count }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
