use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use template_pdf_renderer::api::{configure_routes, json_config, ApiState};
use template_pdf_renderer::AppConfig;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    tracing::info!("Starting template PDF renderer");

    let config = AppConfig::from_env()?;
    tracing::info!(
        bucket = %config.storage.bucket,
        format = %config.pdf.format,
        max_concurrent_renders = config.max_concurrent_renders,
        "Configuration loaded"
    );

    let host = config.host.clone();
    let port = config.port;
    let body_limit = config.max_body_bytes;

    let state = web::Data::new(ApiState::new(config).await?);

    tracing::info!("Starting server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(json_config(body_limit))
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
