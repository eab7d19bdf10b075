mod configuration;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use peakform::catalog::Catalog;
use peakform::flows::Flows;
use peakform::providers::factory;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = configuration::Settings::new()?;
    let addr = settings.server.socket_addr();

    let catalog = match &settings.catalog.path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::demo(),
    };
    info!(products = catalog.len(), "catalog loaded");

    let provider = factory::get_provider(settings.provider.into_config())?;
    let flows = Flows::new(provider, Arc::new(catalog))?;
    let state = state::AppState::new(flows);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
