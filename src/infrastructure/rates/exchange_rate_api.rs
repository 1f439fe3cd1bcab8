use super::RateProvider;
use crate::domain::error::{AppError, Result};
use crate::domain::product::RateTable;
use crate::infrastructure::config::ExchangeRateConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

pub struct ExchangeRateApiClient {
    client: reqwest::Client,
    config: ExchangeRateConfig,
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: Option<HashMap<String, f64>>,
}

impl ExchangeRateApiClient {
    pub fn new(config: ExchangeRateConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::RateProviderError("EXCHANGE_RATE_API_KEY is not configured".to_string())
            })
    }

    fn latest_url(&self, api_key: &str) -> String {
        format!(
            "{}/{}/latest/{}",
            self.config.base_url.trim_end_matches('/'),
            api_key,
            self.config.base
        )
    }
}

/// Picks the configured currencies out of a provider payload. Currencies the
/// provider does not quote are recorded as `0.0`.
fn select_rates(body: LatestRatesResponse, currencies: &[String]) -> Result<RateTable> {
    let conversion_rates = body.conversion_rates.ok_or_else(|| {
        let reason = body
            .error_type
            .or(body.result)
            .unwrap_or_else(|| "missing conversion_rates".to_string());
        AppError::RateProviderError(format!("Unexpected response from rate provider: {}", reason))
    })?;

    Ok(currencies
        .iter()
        .map(|code| {
            let rate = conversion_rates.get(code).copied().unwrap_or(0.0);
            (code.clone(), rate)
        })
        .collect())
}

#[async_trait]
impl RateProvider for ExchangeRateApiClient {
    async fn latest_rates(&self) -> Result<RateTable> {
        let api_key = self.api_key()?;
        let url = self.latest_url(api_key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::RateProviderError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::RateProviderError(format!(
                "Rate provider returned {}: {}",
                status, text
            )));
        }

        let body: LatestRatesResponse = response.json().await.map_err(|e| {
            AppError::RateProviderError(format!("Failed to parse rate response: {}", e))
        })?;

        let rates = select_rates(body, &self.config.currencies)?;
        tracing::info!(
            base = %self.config.base,
            currencies = rates.len(),
            "Fetched exchange rates"
        );
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, web, App, HttpResponse, HttpServer};
    use serde_json::json;

    fn config(base_url: String, api_key: Option<&str>) -> ExchangeRateConfig {
        ExchangeRateConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            ..ExchangeRateConfig::default()
        }
    }

    /// Serves `body` at the latest-rates path for key `test-key` and base USD.
    async fn serve(status: u16, body: serde_json::Value) -> String {
        let server = HttpServer::new(move || {
            let body = body.clone();
            App::new().route(
                "/v6/test-key/latest/USD",
                web::get().to(move || {
                    let body = body.clone();
                    async move {
                        HttpResponse::build(StatusCode::from_u16(status).unwrap()).json(body)
                    }
                }),
            )
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{}/v6", addr)
    }

    #[test]
    fn test_select_rates_defaults_missing_currency_to_zero() {
        let body: LatestRatesResponse = serde_json::from_value(json!({
            "result": "success",
            "conversion_rates": { "USD": 1.0, "EUR": 0.92, "GBP": 0.79 }
        }))
        .unwrap();
        let currencies = vec!["EUR".to_string(), "GBP".to_string(), "XYZ".to_string()];

        let rates = select_rates(body, &currencies).unwrap();

        assert_eq!(rates.len(), 3);
        assert_eq!(rates["EUR"], 0.92);
        assert_eq!(rates["XYZ"], 0.0);
        assert!(!rates.contains_key("USD"));
    }

    #[test]
    fn test_select_rates_requires_conversion_rates() {
        let body: LatestRatesResponse = serde_json::from_value(json!({
            "result": "error",
            "error-type": "invalid-key"
        }))
        .unwrap();

        let err = select_rates(body, &["EUR".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::RateProviderError(ref m) if m.contains("invalid-key")));
    }

    #[test]
    fn test_latest_url_layout() {
        let client = ExchangeRateApiClient::new(config(
            "https://rates.example/v6/".to_string(),
            Some("abc"),
        ));
        assert_eq!(
            client.latest_url("abc"),
            "https://rates.example/v6/abc/latest/USD"
        );
    }

    #[actix_web::test]
    async fn test_missing_api_key_is_rejected_before_request() {
        let client = ExchangeRateApiClient::new(config("http://127.0.0.1:9".to_string(), None));
        let err = client.latest_rates().await.unwrap_err();
        assert!(err.to_string().contains("EXCHANGE_RATE_API_KEY"));
    }

    #[actix_web::test]
    async fn test_latest_rates_over_http() {
        let base_url = serve(
            200,
            json!({
                "result": "success",
                "base_code": "USD",
                "conversion_rates": {
                    "USD": 1.0, "EUR": 0.92, "GBP": 0.79, "JPY": 151.3, "MXN": 17.1, "CAD": 1.36
                }
            }),
        )
        .await;
        let client = ExchangeRateApiClient::new(config(base_url, Some("test-key")));

        let rates = client.latest_rates().await.unwrap();

        assert_eq!(rates.len(), 5);
        assert_eq!(rates["JPY"], 151.3);
        assert_eq!(rates["CAD"], 1.36);
    }

    #[actix_web::test]
    async fn test_non_success_status_is_provider_error() {
        let base_url = serve(403, json!({ "result": "error", "error-type": "inactive-account" })).await;
        let client = ExchangeRateApiClient::new(config(base_url, Some("test-key")));

        let err = client.latest_rates().await.unwrap_err();
        assert!(matches!(err, AppError::RateProviderError(ref m) if m.contains("403")));
    }
}
