use std::sync::Arc;

use tracing::{error, info};

use crate::application::{ProductCatalogUseCase, ProductIngestionUseCase};
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::sqlite::SqliteRepository;
use crate::infrastructure::log_buffer::LogBuffer;
use crate::infrastructure::rates::{ExchangeRateApiClient, RateProvider};
use crate::interfaces::http::AppState;

/// Opens the database and wires the use cases.
pub async fn build_app_state(config: &AppConfig, logs: Arc<LogBuffer>) -> Result<Arc<AppState>> {
    let repository = SqliteRepository::init(&config.database.url, config.database.max_connections)
        .await
        .map_err(|err| {
            error!(error = %err, database_url = %config.database.url, "Failed to open database");
            err
        })?;
    let repository = Arc::new(repository);
    info!(database_url = %config.database.url, "Database ready");

    if config.exchange_rate.api_key.is_none() {
        logs.add(
            "WARN",
            "System",
            "EXCHANGE_RATE_API_KEY is not set; uploads will fail until it is configured",
        );
    }

    let rate_provider: Arc<dyn RateProvider + Send + Sync> =
        Arc::new(ExchangeRateApiClient::new(config.exchange_rate.clone()));

    let ingestion_use_case = ProductIngestionUseCase::new(
        repository.clone(),
        rate_provider,
        config.ingest.batch_size,
        logs,
    );
    let catalog_use_case = ProductCatalogUseCase::new(repository);

    Ok(Arc::new(AppState {
        ingestion_use_case,
        catalog_use_case,
        max_upload_bytes: config.server.max_upload_bytes,
    }))
}
