use actix_web::web;

use super::error::ApiError;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(handlers::health_check))
        .route("/metrics", web::get().to(handlers::metrics_endpoint))
        .route("/generate", web::post().to(handlers::generate))
        .default_service(web::route().to(handlers::not_found));
}

/// JSON extractor settings: body size limit, and malformed bodies answered
/// with the same `{"detail": ...}` shape as every other error.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            ApiError::bad_request(format!("invalid request body: {}", err)).into()
        })
}
