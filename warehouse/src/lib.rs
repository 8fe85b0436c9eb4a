pub mod api;
pub mod models;
pub mod processor;
pub mod reports;
pub mod schema;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;

use common::Result;
use common::config::Settings;
use processor::RebuildSummary;
use services::WarehouseService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Loads the configured source once and rebuilds the warehouse from it.
pub async fn run_rebuild(settings: &Settings) -> Result<RebuildSummary> {
    let service = WarehouseService::new(settings).await?;
    service.rebuild_from_source().await
}

/// Builds the first generation, then serves reports until the process exits.
pub async fn run_server(settings: &Settings) -> Result<()> {
    let service = Arc::new(WarehouseService::new(settings).await?);
    service.rebuild_from_source().await?;

    let api_router = api::routes(Arc::clone(&service));

    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port)
        .parse()
        .map_err(|e| common::Error::InvalidInput(format!("Invalid API address: {}", e)))?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Warehouse API server listening");
    axum::serve(listener, api_router).await?;

    Ok(())
}
