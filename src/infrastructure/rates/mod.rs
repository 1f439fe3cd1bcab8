pub mod exchange_rate_api;

use crate::domain::error::Result;
use crate::domain::product::RateTable;
use async_trait::async_trait;

pub use exchange_rate_api::ExchangeRateApiClient;

/// Source of the latest conversion rates for the configured currencies.
#[async_trait]
pub trait RateProvider {
    async fn latest_rates(&self) -> Result<RateTable>;
}
