use crate::domain::error::{AppError, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// File read when `PRODUCT_READER_CONFIG` does not point elsewhere.
pub const DEFAULT_CONFIG_FILE: &str = "product_reader.toml";
pub const CONFIG_PATH_ENV: &str = "PRODUCT_READER_CONFIG";
pub const ENV_PREFIX: &str = "PRODUCT_READER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://products.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub base: String,
    pub currencies: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: None,
            base: "USD".to_string(),
            currencies: ["EUR", "GBP", "JPY", "MXN", "CAD"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::application::use_cases::batch::DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub exchange_rate: ExchangeRateConfig,
    pub ingest: IngestConfig,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            exchange_rate: ExchangeRateConfig::default(),
            ingest: IngestConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `.env`, then every configured source, then validates.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment())
    }

    /// Sources in increasing priority: defaults, the TOML file, prefixed
    /// environment variables, and finally the bare `PORT` and
    /// `EXCHANGE_RATE_API_KEY` variables.
    pub fn figment() -> Figment {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
            .merge(
                Env::raw()
                    .only(&["EXCHANGE_RATE_API_KEY"])
                    .map(|_| "exchange_rate.api_key".into()),
            )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::ValidationError(
                "server.port must be greater than zero".to_string(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(AppError::ValidationError(
                "server.max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.ingest.batch_size == 0 {
            return Err(AppError::ValidationError(
                "ingest.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.exchange_rate.currencies.is_empty() {
            return Err(AppError::ValidationError(
                "exchange_rate.currencies must list at least one currency".to_string(),
            ));
        }
        if self.exchange_rate.base.trim().is_empty() {
            return Err(AppError::ValidationError(
                "exchange_rate.base must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
