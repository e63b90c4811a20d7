pub mod domain;
pub mod handlers;
pub mod routes;
pub mod shared;
pub mod system;

use std::net::SocketAddr;

use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let config = shared::config::load_config()?;

    let conn = shared::data::db::connect(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;

    let app = routes::build_app(routes::AppState::new(conn));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Product API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
