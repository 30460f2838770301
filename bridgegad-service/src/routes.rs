use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bridgegad_engine::BridgeExportRequest;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::errors::{ExportError, detail_response};
use crate::export::ExportService;

pub const EXPORT_ROUTE: &str = "/api/export/dwg";
pub const HEALTH_ROUTE: &str = "/api/health";
pub const MEDIA_TYPE: &str = "application/acad";

pub fn router(service: ExportService) -> Router {
    Router::new()
        .route(EXPORT_ROUTE, post(export_drawing))
        .route(HEALTH_ROUTE, get(health))
        .with_state(Arc::new(service))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

async fn export_drawing(
    State(service): State<Arc<ExportService>>,
    payload: Result<Json<BridgeExportRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "导出请求体无效");
            return detail_response(rejection.status(), rejection.body_text());
        }
    };
    debug!(cross_sections = request.cross_sections.len(), "收到导出请求");

    let worker = Arc::clone(&service);
    let outcome = tokio::task::spawn_blocking(move || worker.export(&request))
        .await
        .map_err(|err| ExportError::Join(err.to_string()))
        .and_then(|result| result);

    match outcome {
        Ok(file) => {
            let disposition = format!("attachment; filename=\"{}\"", file.file_name);
            (
                [
                    (header::CONTENT_TYPE, MEDIA_TYPE.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                file.bytes,
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
