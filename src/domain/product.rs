use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

/// Longest name the `products.name` column accepts.
pub const MAX_NAME_LENGTH: usize = 255;

/// Largest price representable by a `decimal(10,2)` column.
pub const MAX_PRICE: f64 = 99_999_999.99;

/// Currency code -> rate against the configured base currency.
pub type RateTable = BTreeMap<String, f64>;

/// One rate table shared by every row of a run.
pub type CurrencyRates = Arc<RateTable>;

/// A product row exactly as it came out of the CSV decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub name: String,
    pub price: String,
    pub expiration: String,
}

impl RawRow {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        expiration: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            expiration: expiration.into(),
        }
    }

    /// True when the decoder produced a record with nothing in it.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            && self.price.trim().is_empty()
            && self.expiration.trim().is_empty()
    }

    /// JSON rendering used inside omission diagnostics.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"name\":{:?},\"price\":{:?},\"expiration\":{:?}}}",
                self.name, self.price, self.expiration
            )
        })
    }
}

/// A sanitized, validated row ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanRow {
    pub name: String,
    pub price: f64,
    pub expiration: NaiveDate,
    pub currency_rates: CurrencyRates,
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub expiration: NaiveDate,
    pub currency_rates: RateTable,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a single product outside of a CSV upload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 0.0, max = 99_999_999.99))]
    pub price: f64,
    pub expiration: NaiveDate,
    #[serde(default)]
    pub currency_rates: RateTable,
}

impl From<NewProduct> for CleanRow {
    fn from(product: NewProduct) -> Self {
        Self {
            name: product.name,
            price: product.price,
            expiration: product.expiration,
            currency_rates: Arc::new(product.currency_rates),
        }
    }
}
