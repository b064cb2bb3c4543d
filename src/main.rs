use anyhow::{Context, Result};
use shared::{Config, DatabaseService};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sheet_sync::{
    create_app_router,
    processing::{BatchQueue, BatchWorkerPool, Dispatcher},
    services::{bootstrap_subscription, PgDestinationStore, SheetRowFetcher, SmartsheetClient},
    state::AppState,
};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_new(&config.app.log_level)
        .with_context(|| format!("invalid RUST_LOG filter {:?}", config.app.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Register every collector before the first scrape
    lazy_static::initialize(&sheet_sync::observability::metrics::BATCHES_IN_FLIGHT);

    let database = match DatabaseService::new(&config.database).await {
        Ok(database) => database,
        Err(e) => {
            error!("Could not connect to the destination database: {}", e);
            std::process::exit(1);
        }
    };

    let client = SmartsheetClient::new(&config.smartsheet)?;
    let sheet_id = config.smartsheet.sheet_id;
    match client.get_sheet(sheet_id).await {
        Ok(sheet) => info!(
            "Replicating sheet {} ({}) {}",
            sheet.name,
            sheet.id,
            sheet.permalink.as_deref().unwrap_or("")
        ),
        Err(e) => error!("Could not read sheet {}: {}", sheet_id, e),
    }

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(SheetRowFetcher::new(client.clone(), sheet_id)),
        Arc::new(PgDestinationStore::new(database.clone(), &config.database.table)),
    ));
    let (batch_queue, receiver) = BatchQueue::new(config.worker.queue_capacity);
    let pool = BatchWorkerPool::start(
        dispatcher,
        receiver,
        batch_queue.stats(),
        config.worker.max_concurrent_batches,
    );

    let app_state = AppState::new(batch_queue, database, config.worker.clone());
    let app = create_app_router(Arc::new(app_state));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    tokio::spawn(bootstrap_subscription(client, sheet_id, config.webhook.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue sender; workers drain what is left
    pool.join().await;

    Ok(())
}
