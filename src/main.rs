use random_image_api::{
    config::Config,
    logging::LoggerManager,
    selector::ImageSelector,
    server::ApiServer,
    shutdown::{ShutdownCoordinator, ShutdownSignal},
    startup::DirectoryValidator,
    stats::StatsStore,
    ApiError, Result,
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Establish required directories before initializing any components.
    // Failure here is fatal: the service must not start serving without them.
    DirectoryValidator::validate_all(
        &config.storage.image_dir(),
        &config.storage.data_file(),
        &config.app_log_dir(),
    )?;

    // Initialize logging
    let hostname = gethostname::gethostname().to_string_lossy().to_string();
    LoggerManager::from_config(&config, hostname).initialize()?;

    info!(
        "Starting random image API v{} (built: {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIMESTAMP")
    );
    info!("HTTP port: {}", config.server.port);
    info!("Image directory: {}", config.storage.image_dir().display());
    info!("Data file: {}", config.storage.data_file().display());

    // Load persisted counters; missing or corrupt state degrades to empty
    let stats = StatsStore::new(config.storage.data_file());
    stats.load().await;

    // Report image directory contents at startup, best-effort
    let selector = ImageSelector::new(config.storage.image_dir());
    match std::fs::read_dir(selector.image_dir()) {
        Ok(_) => {
            info!("Image directory contains {} files", selector.count_files());
        }
        Err(e) => {
            warn!("Cannot read image directory: {}", e);
        }
    }

    // Initialize shutdown coordinator with the store for the final persist
    let mut shutdown_coordinator = ShutdownCoordinator::new(Duration::from_secs(10));
    shutdown_coordinator.set_stats_store(stats.clone());

    let bind_ip = config
        .server
        .bind_address
        .parse()
        .map_err(|e| ApiError::ConfigError(format!("Invalid bind address: {}", e)))?;
    let addr = SocketAddr::new(bind_ip, config.server.port);
    let server = ApiServer::new(addr, &config, stats);

    let server_shutdown = ShutdownSignal::new(shutdown_coordinator.subscribe());
    let _server_task = tokio::spawn(async move {
        if let Err(e) = server.start(server_shutdown).await {
            error!("API server failed: {}", e);
        }
    });

    // Wait for a termination signal, then run the coordinator's teardown
    let shutdown_task = tokio::spawn(async move {
        if let Err(e) = shutdown_coordinator.listen_for_shutdown().await {
            error!("Shutdown coordinator failed: {}", e);
        }
    });

    shutdown_task.await.ok();

    // Give the server task a moment to finish after its shutdown signal
    tokio::time::sleep(Duration::from_millis(500)).await;

    info!("Random image API shutdown complete");
    Ok(())
}
