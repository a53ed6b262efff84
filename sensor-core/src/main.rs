//! Sentinel Sensor - Main Entry Point

use sensor_core::{bridge, constants, SensorManager};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting Sentinel Sensor v{}...", constants::APP_VERSION);

    let data_dir = constants::get_data_dir();
    log::info!("Data directory: {}", data_dir.display());

    let manager = match SensorManager::new(constants::get_hq_url(), data_dir) {
        Ok(manager) => manager,
        Err(e) => {
            log::error!("Failed to initialize HQ client: {}", e);
            std::process::exit(1);
        }
    };
    manager.start().await;

    let (handle, rx) = bridge::channel(32);
    tokio::spawn(bridge::serve(rx, Some(manager.clone())));

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }

    match handle.get_sensor_status().await {
        Ok(Some(status)) => log::info!(
            "Shutting down: {} heartbeats, {} ok, health {:.0}",
            status.heartbeat_count,
            status.success_count,
            status.system_health
        ),
        Ok(None) => log::info!("Shutting down"),
        Err(e) => log::warn!("Shutting down: {}", e),
    }
    manager.stop();
}
