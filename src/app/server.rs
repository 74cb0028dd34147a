use crate::adapters::memory::InMemoryRepository;
use crate::config::{GatewayConfig, Role};
use crate::core::broadcast::BroadcastHub;
use crate::core::catalog::CatalogService;
use crate::core::orchestrator::AggregationOrchestrator;
use crate::core::ConfigProvider;
use crate::domain::model::{MovieInfo, Review};
use crate::http;
use crate::utils::error::Result;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub async fn serve(config: &GatewayConfig, role: Role) -> Result<()> {
    match role {
        Role::Gateway => serve_gateway(config).await,
        Role::MoviesInfo => serve_movies_info(config).await,
        Role::Reviews => serve_reviews(config).await,
    }
}

pub async fn serve_gateway(config: &GatewayConfig) -> Result<()> {
    let orchestrator = AggregationOrchestrator::from_config(config)?;
    tracing::info!(
        "🔗 Upstreams: movies info at {}, reviews at {} (retries: {}, delay: {:?})",
        config.movies_info_url(),
        config.reviews_url(),
        config.retry_policy().max_retries(),
        config.retry_policy().delay()
    );

    let addr = config.bind_addr(Role::Gateway)?;
    let listener = TcpListener::bind(addr).await?;
    run_gateway(orchestrator, listener, shutdown_signal()).await
}

/// Runs the gateway on `listener`. Relayed feeds end when `shutdown` resolves.
pub async fn run_gateway<F>(
    orchestrator: AggregationOrchestrator,
    listener: TcpListener,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let streams = CancellationToken::new();
    let router = http::gateway_router(orchestrator, streams.clone());
    let shutdown = async move {
        shutdown.await;
        streams.cancel();
    };
    run_on("gateway", router, listener, shutdown).await
}

pub async fn serve_movies_info(config: &GatewayConfig) -> Result<()> {
    let hub = BroadcastHub::new("movies-info");
    let repository = Arc::new(InMemoryRepository::<MovieInfo>::new());
    let service = CatalogService::new(repository, hub.clone());

    let addr = config.bind_addr(Role::MoviesInfo)?;
    let shutdown = async move {
        shutdown_signal().await;
        hub.close();
    };
    run("movies-info", http::movies_info_router(service), addr, shutdown).await
}

pub async fn serve_reviews(config: &GatewayConfig) -> Result<()> {
    let hub = BroadcastHub::new("reviews");
    let repository = Arc::new(InMemoryRepository::<Review>::new());
    let service = CatalogService::new(repository, hub.clone());

    let addr = config.bind_addr(Role::Reviews)?;
    let shutdown = async move {
        shutdown_signal().await;
        hub.close();
    };
    run("reviews", http::reviews_router(service), addr, shutdown).await
}

/// Serves `router` on `addr` until `shutdown` resolves and in-flight requests
/// drain.
pub async fn run<F>(name: &str, router: Router, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    run_on(name, router, listener, shutdown).await
}

pub async fn run_on<F>(name: &str, router: Router, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("🚀 {} listening on {}", name, listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("👋 {} stopped", name);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
