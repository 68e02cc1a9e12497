use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{ScanRecord, ScanRequest, ScanResponse};
use crate::{error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/scans", get(list_scans))
}

pub fn write_routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/scan", post(process_scan))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// POST /api/scan { image: "<base64 or data url>" }
#[instrument(skip(state, payload))]
pub async fn process_scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, AppError> {
    let Json(req) = payload?;
    let res = state.scans.process(req).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn list_scans(State(state): State<AppState>) -> Result<Json<Vec<ScanRecord>>, AppError> {
    let scans = state.scans.list().await?;
    Ok(Json(scans))
}
