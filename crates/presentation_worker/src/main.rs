//! Location enrichment worker
//!
//! Main entry point for the stream-consuming enrichment service.

use std::sync::Arc;

use anyhow::Context;
use application::ports::{BoundaryStore, LocationEnricher, RoutingMatrixPort, TransportStore};
use application::{
    BoundaryResolver, EnrichmentService, PriorityTransportSearch, RoutingBatchScheduler,
};
use infrastructure::{
    AppConfig, PostgisBoundaryStore, PostgisTransportStore, RedisStreamAdapter,
    RoutingMatrixAdapter, create_pool, init_telemetry,
};
use integration_routing::{MatrixClient, MatrixRoutingClient};
use presentation_worker::{StreamWorker, StreamWorkerSettings, WorkerManager};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_telemetry(&config.telemetry).context("Failed to initialize logging")?;

    info!("Location enricher v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    info!(
        input_stream = %config.stream.input_stream,
        result_stream = %config.stream.result_stream,
        workers = config.stream.worker_count,
        routing = config.scheduler.enabled,
        "Configuration loaded"
    );

    let cancel = CancellationToken::new();

    // Stores
    let pool = create_pool(&config.database).context("Failed to create database pool")?;
    let boundaries: Arc<dyn BoundaryStore> = Arc::new(PostgisBoundaryStore::new(pool.clone()));
    let stations: Arc<dyn TransportStore> = Arc::new(PostgisTransportStore::new(pool.clone()));

    // Services
    let resolver = BoundaryResolver::new(boundaries);
    let transport = PriorityTransportSearch::new(stations).with_config(config.transport.clone());
    let mut service = EnrichmentService::new(resolver, transport);

    let scheduler = if config.scheduler.enabled {
        let client: Arc<dyn MatrixClient> = Arc::new(
            MatrixRoutingClient::new(&config.routing)
                .map_err(|e| anyhow::anyhow!("Failed to initialize routing client: {e}"))?,
        );
        let routing: Arc<dyn RoutingMatrixPort> = Arc::new(
            RoutingMatrixAdapter::new(client).with_circuit_breaker_config(
                config.resilience.routing_circuit_breaker.clone(),
            ),
        );
        let mut scheduler = RoutingBatchScheduler::new(routing, config.scheduler.clone());
        let handle = scheduler
            .start(&cancel)
            .map_err(|e| anyhow::anyhow!("Failed to start routing scheduler: {e}"))?;
        let scheduler = Arc::new(scheduler);
        service = service.with_scheduler(Arc::clone(&scheduler));
        Some((scheduler, handle))
    } else {
        info!("Routing scheduler disabled, walking estimates use straight-line distance");
        None
    };
    let enricher: Arc<dyn LocationEnricher> = Arc::new(service);

    // Workers, one stream connection each
    let manager = WorkerManager::new(config.shutdown_timeout());
    for n in 0..config.stream.worker_count {
        let stream = RedisStreamAdapter::connect(&config.stream.redis_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {e}"))?;
        let worker = StreamWorker::new(
            Arc::new(stream),
            Arc::clone(&enricher),
            StreamWorkerSettings::from_config(&config.stream, n),
        );
        manager.register(Arc::new(worker))?;
    }
    manager.start(&cancel)?;

    info!("Enrichment worker running");
    shutdown_signal().await;

    if let Err(e) = manager.stop().await {
        error!("Worker shutdown incomplete: {}", e);
    }
    if let Some((scheduler, handle)) = scheduler {
        scheduler.stop();
        if let Err(e) = handle.await {
            error!("Routing scheduler task failed: {}", e);
        }
    }
    cancel.cancel();
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
