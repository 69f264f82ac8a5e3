use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use targetline::error::AppError;
use targetline::workflows::admissions::{AdmissionsImporter, AdmissionsSummary};
use targetline::workflows::targets::{target_router, SubmissionStore, TargetCatalog, TargetService};

#[derive(Debug, Deserialize)]
pub(crate) struct AdmissionsReportRequest {
    pub(crate) applicants_csv: String,
    pub(crate) applications_csv: String,
}

pub(crate) fn with_target_routes<C, S>(service: Arc<TargetService<C, S>>) -> axum::Router
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    target_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/admissions/report",
            axum::routing::post(admissions_report_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn admissions_report_endpoint(
    Json(payload): Json<AdmissionsReportRequest>,
) -> Result<Json<AdmissionsSummary>, AppError> {
    let AdmissionsReportRequest {
        applicants_csv,
        applications_csv,
    } = payload;

    let summary = AdmissionsImporter::from_readers(
        Cursor::new(applicants_csv.into_bytes()),
        Cursor::new(applications_csv.into_bytes()),
    )?;
    Ok(Json(summary))
}
