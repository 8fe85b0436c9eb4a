use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::models::{ApiResponse, ReportInfo};
use crate::processor::RebuildSummary;
use crate::reports::{Report, ReportResult};
use crate::services::{AppError, WarehouseService};

pub async fn list_reports() -> Json<ApiResponse<Vec<ReportInfo>>> {
    Json(ApiResponse::success(
        Report::ALL.into_iter().map(ReportInfo::from).collect(),
    ))
}

pub async fn get_report(
    Path(name): Path<String>,
    State(service): State<Arc<WarehouseService>>,
) -> Result<Json<ApiResponse<ReportResult>>, AppError> {
    let result = service.run_report(&name).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn get_snapshot(
    State(service): State<Arc<WarehouseService>>,
) -> Result<Json<ApiResponse<RebuildSummary>>, AppError> {
    let summary = service.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

pub async fn rebuild(
    State(service): State<Arc<WarehouseService>>,
) -> Result<Json<ApiResponse<RebuildSummary>>, AppError> {
    let summary = service.rebuild_from_source().await?;
    Ok(Json(ApiResponse::success(summary)))
}

// Define all API routes
pub fn routes(service: Arc<WarehouseService>) -> Router {
    Router::new()
        .route("/api/reports", get(list_reports))
        .route("/api/reports/{name}", get(get_report))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/rebuild", post(rebuild))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
