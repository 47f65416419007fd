use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::chain::abbreviate_address;

use super::error::ApiError;
use super::types::{input_schema, JobResponse, StartJobRequest, StatusQuery};
use super::AppState;

/// `POST /start_job`: validates the input, creates a pending job and
/// schedules it. Returns before any analysis work happens.
#[instrument(skip_all)]
pub(super) async fn start_job(
    State(state): State<AppState>,
    payload: Result<Json<StartJobRequest>, JsonRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = body.input_data.into_request()?;

    let wallets: Vec<String> = request
        .addresses()
        .into_iter()
        .map(abbreviate_address)
        .collect();
    let (job, _handle) = state.runner.start(request);
    info!(job_id = %job.id, kind = ?job.kind, ?wallets, "Job accepted");

    Ok(Json(JobResponse::from(job)))
}

/// `GET /status?job_id=<id>`
#[instrument(skip_all)]
pub(super) async fn job_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    state
        .store
        .get(&query.job_id)
        .map(|job| Json(JobResponse::from(job)))
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

/// `GET /input_schema`
pub(super) async fn get_input_schema() -> Result<Json<Value>, ApiError> {
    input_schema()
        .map(Json)
        .map_err(|e| ApiError::Internal(format!("Input schema is invalid: {}", e)))
}

/// `GET /health`
pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fallback for unknown routes.
pub(super) async fn handler_404() -> ApiError {
    ApiError::NotFound("The requested resource was not found".to_string())
}
