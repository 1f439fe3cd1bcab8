pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::infrastructure::bootstrap::build_app_state;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::log_buffer::LogBuffer;
use crate::interfaces::http::start_server;

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run() -> std::io::Result<()> {
    let config = AppConfig::load();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_filter.as_str())
            .unwrap_or("info"),
    );

    let config = config.map_err(|err| {
        error!(error = %err, "Invalid configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;

    let logs = Arc::new(LogBuffer::default());
    let app_state = build_app_state(&config, logs.clone())
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    let server = start_server(app_state, logs.clone(), &config.server).map_err(|err| {
        error!(
            error = %err,
            host = %config.server.host,
            port = config.server.port,
            "Failed to bind HTTP server"
        );
        err
    })?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        batch_size = config.ingest.batch_size,
        "Product reader listening"
    );
    logs.add(
        "INFO",
        "System",
        &format!(
            "HTTP server listening on {}:{}",
            config.server.host, config.server.port
        ),
    );

    server.await
}
