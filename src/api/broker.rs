use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::http_client::HttpClient;
use crate::config::constant::BROKER_CURRENCY;
use crate::error::FreightError;
use crate::freight::request::QuoteRequest;

pub const DEFAULT_PREDICTION_URL: &str =
    "https://api.platform.trans.eu/ext/freights-price-prediction/v1/prediction";

#[derive(Debug, Clone, Deserialize)]
pub struct PricePrediction {
    #[serde(default)]
    pub prediction: Vec<f64>,
    pub currency: Option<String>,
}

impl PricePrediction {
    /// First predicted price, which must be quoted in EUR.
    pub fn eur_price(&self) -> Result<f64, FreightError> {
        match self.currency.as_deref() {
            Some(currency) if currency.eq_ignore_ascii_case(BROKER_CURRENCY) => {}
            other => {
                return Err(FreightError::MalformedResponse(format!(
                    "unexpected currency {:?}",
                    other
                )))
            }
        }
        self.prediction
            .first()
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| FreightError::MalformedResponse("empty prediction".into()))
    }
}

/// Client for the freight exchange price prediction endpoint.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: HttpClient,
    url: String,
    access_token: Option<String>,
    api_key: Option<String>,
}

impl BrokerClient {
    pub fn new(
        http: HttpClient,
        url: Option<String>,
        access_token: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            url: url.unwrap_or_else(|| DEFAULT_PREDICTION_URL.to_string()),
            access_token,
            api_key,
        }
    }

    fn headers(&self) -> Result<HeaderMap, FreightError> {
        let token = self
            .access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FreightError::ConfigurationMissing("broker access token".into()))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| FreightError::ConfigurationMissing("valid broker access token".into()))?;
        headers.insert(AUTHORIZATION, bearer);

        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let value = HeaderValue::from_str(key)
                .map_err(|_| FreightError::ConfigurationMissing("valid broker api key".into()))?;
            headers.insert("api-key", value);
        }
        Ok(headers)
    }

    pub async fn predict_price(
        &self,
        request: &QuoteRequest,
    ) -> Result<PricePrediction, FreightError> {
        let headers = self.headers()?;
        info!(
            "Requesting broker price prediction ({} m, vehicle {})",
            request.distance, request.vehicle_requirements.vehicle_size_id
        );

        let response = self
            .http
            .post_json(&self.url, request, headers)
            .await
            .map_err(FreightError::BrokerUnavailable)?;

        if !response.is_success() {
            error!("Broker returned HTTP {}: {}", response.status, response.preview());
            return Err(FreightError::BrokerUnavailable(format!(
                "HTTP {}",
                response.status
            )));
        }

        debug!("Broker response: {}", response.preview());
        serde_json::from_str(&response.body)
            .map_err(|e| FreightError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_eur_prediction() {
        let prediction: PricePrediction =
            serde_json::from_str(r#"{"prediction": [420.5, 380.0], "currency": "EUR"}"#).unwrap();
        assert_eq!(prediction.eur_price(), Ok(420.5));
    }

    #[test]
    fn rejects_other_currencies_and_empty_predictions() {
        let pln: PricePrediction =
            serde_json::from_str(r#"{"prediction": [420.5], "currency": "PLN"}"#).unwrap();
        assert!(pln.eur_price().is_err());

        let empty: PricePrediction =
            serde_json::from_str(r#"{"prediction": [], "currency": "EUR"}"#).unwrap();
        assert!(empty.eur_price().is_err());
    }
}
