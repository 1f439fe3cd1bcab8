use std::sync::Arc;

use super::sanitizer::ValidatedRow;
use crate::domain::product::{CleanRow, CurrencyRates};

/// Hands the run's single rate table to every validated row.
pub struct RateAttacher {
    rates: CurrencyRates,
}

impl RateAttacher {
    pub fn new(rates: CurrencyRates) -> Self {
        Self { rates }
    }

    pub fn attach(&self, row: ValidatedRow) -> CleanRow {
        CleanRow {
            name: row.name,
            price: row.price,
            expiration: row.expiration,
            currency_rates: Arc::clone(&self.rates),
        }
    }
}
