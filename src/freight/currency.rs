use std::fmt;

use serde::Deserialize;

use crate::config::constant::BROKER_CURRENCY;
use crate::error::FreightError;

/// Source of exchange rates: `rate(from, to)` units of `to` per unit of `from`.
pub trait CurrencyRates: Send + Sync + fmt::Debug {
    fn rate(&self, from: &str, to: &str) -> Option<f64>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExchangeRate {
    pub from: String,
    pub to: String,
    pub rate: f64,
}

/// Rates fixed in configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StaticRates {
    #[serde(default)]
    pub rates: Vec<ExchangeRate>,
}

impl StaticRates {
    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.rates.push(ExchangeRate {
            from: from.to_string(),
            to: to.to_string(),
            rate,
        });
        self
    }
}

impl CurrencyRates for StaticRates {
    fn rate(&self, from: &str, to: &str) -> Option<f64> {
        self.rates
            .iter()
            .find(|r| r.from.eq_ignore_ascii_case(from) && r.to.eq_ignore_ascii_case(to))
            .map(|r| r.rate)
    }
}

/// Convert a broker (EUR) amount to the store currency.
///
/// Prefers the store -> EUR rate (dividing by it) and falls back to the
/// EUR -> store rate (multiplying).
pub fn convert_from_eur(
    amount_eur: f64,
    store_currency: &str,
    rates: &dyn CurrencyRates,
) -> Result<f64, FreightError> {
    if store_currency.eq_ignore_ascii_case(BROKER_CURRENCY) {
        return Ok(amount_eur);
    }

    if let Some(rate) = rates
        .rate(store_currency, BROKER_CURRENCY)
        .filter(|r| r.is_finite() && *r > 0.0)
    {
        return Ok(amount_eur / rate);
    }

    rates
        .rate(BROKER_CURRENCY, store_currency)
        .filter(|r| r.is_finite() && *r > 0.0)
        .map(|rate| amount_eur * rate)
        .ok_or_else(|| FreightError::CurrencyConversion(store_currency.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euro_store_needs_no_rate() {
        assert_eq!(convert_from_eur(100.0, "EUR", &StaticRates::default()), Ok(100.0));
    }

    #[test]
    fn divides_by_store_to_eur_rate() {
        let rates = StaticRates::default().with_rate("PLN", "EUR", 0.25);
        assert_eq!(convert_from_eur(100.0, "PLN", &rates), Ok(400.0));
    }

    #[test]
    fn falls_back_to_eur_to_store_rate() {
        let rates = StaticRates::default()
            .with_rate("PLN", "EUR", 0.0)
            .with_rate("EUR", "PLN", 4.0);
        assert_eq!(convert_from_eur(100.0, "pln", &rates), Ok(400.0));
    }

    #[test]
    fn missing_rate_is_an_error() {
        assert_eq!(
            convert_from_eur(100.0, "CZK", &StaticRates::default()),
            Err(FreightError::CurrencyConversion("CZK".into()))
        );
    }
}
