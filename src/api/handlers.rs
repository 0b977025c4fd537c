use actix_web::{web, HttpResponse};
use std::time::Instant;

use crate::models::{GenerateRequest, RenderRequest};
use super::error::{ApiError, ApiResult};
use super::state::ApiState;

/// Render a stored template against the posted data and answer with the PDF.
pub async fn generate(
    body: web::Json<GenerateRequest>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let start = Instant::now();

    let request = match RenderRequest::from_wire(body.into_inner(), &state.config.pdf) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected generate request: {}", e);
            state.metrics.record(e.stage(), start.elapsed().as_secs_f64());
            return Err(e.into());
        }
    };

    match state.generator.generate(&request).await {
        Ok(document) => {
            state.metrics.record("success", start.elapsed().as_secs_f64());
            tracing::info!(
                request_id = %request.id,
                format = %document.format,
                margin = ?document.margin,
                "Serving PDF"
            );

            Ok(HttpResponse::Ok()
                .content_type("application/pdf")
                .body(document.bytes))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request.id,
                template = %request.template_name,
                stage = e.stage(),
                "Failed to generate PDF: {}",
                e
            );
            state.metrics.record(e.stage(), start.elapsed().as_secs_f64());

            Err(ApiError::from(e))
        }
    }
}

/// Liveness only. Storage and browser are not checked.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "UP"
    }))
}

pub async fn metrics_endpoint(state: web::Data<ApiState>) -> ApiResult<HttpResponse> {
    let buffer = state.metrics.encode()?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer))
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "detail": "Not Found"
    }))
}
