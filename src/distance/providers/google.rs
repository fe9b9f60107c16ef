use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::DistanceProvider;
use crate::api::http_client::HttpClient;
use crate::domain::{Coordinates, DistanceResult};
use crate::error::DistanceError;

pub const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
pub const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Distance Matrix, one origin and one destination per call.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    http: HttpClient,
    api_key: Option<String>,
    matrix_url: String,
    geocode_url: String,
}

impl GoogleProvider {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            matrix_url: DISTANCE_MATRIX_URL.to_string(),
            geocode_url: GEOCODE_URL.to_string(),
        }
    }

    pub fn with_urls(mut self, matrix_url: impl Into<String>, geocode_url: impl Into<String>) -> Self {
        self.matrix_url = matrix_url.into();
        self.geocode_url = geocode_url.into();
        self
    }

    fn api_key(&self) -> Result<&str, DistanceError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(DistanceError::MissingCredentials { provider: "Google" })
    }
}

#[async_trait]
impl DistanceProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn resolve_coordinates(&self, address: &str) -> Result<Coordinates, DistanceError> {
        let key = self.api_key()?;
        let response = self
            .http
            .get_with_params(&self.geocode_url, &[("address", address), ("key", key)])
            .await
            .map_err(DistanceError::Http)?;

        let parsed: GeocodeResponse = serde_json::from_str(&response.body).map_err(|e| {
            error!("Failed to parse Google geocode JSON: {} ({})", e, response.preview());
            DistanceError::MalformedResponse(e.to_string())
        })?;

        if parsed.status != "OK" {
            let message = match parsed.error_message {
                Some(msg) => format!("{}: {}", parsed.status, msg),
                None => parsed.status,
            };
            return Err(DistanceError::GeocodingFailed(message));
        }

        parsed
            .results
            .first()
            .map(|r| Coordinates {
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })
            .ok_or_else(|| DistanceError::GeocodingFailed("Address not found".into()))
    }

    async fn route_distance(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<DistanceResult, DistanceError> {
        let key = self.api_key()?;
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Err(DistanceError::MissingAddress);
        }

        info!("Requesting Google distance matrix");
        debug!("origin='{}' destination='{}'", origin, destination);
        let response = self
            .http
            .get_with_params(
                &self.matrix_url,
                &[("origins", origin), ("destinations", destination), ("key", key)],
            )
            .await
            .map_err(DistanceError::Http)?;

        parse_matrix_response(&response.body)
    }
}

/// Turn a single-cell distance matrix into a [`DistanceResult`].
pub fn parse_matrix_response(body: &str) -> Result<DistanceResult, DistanceError> {
    let response: DistanceMatrixResponse = serde_json::from_str(body)
        .map_err(|e| DistanceError::MalformedResponse(e.to_string()))?;

    let element = response
        .rows
        .first()
        .and_then(|row| row.elements.first());

    let element = match element {
        Some(element) => element,
        None => {
            let status = response.status.unwrap_or_else(|| "UNKNOWN".into());
            return Err(match response.error_message {
                Some(msg) => DistanceError::ProviderStatus(format!("{}: {}", status, msg)),
                None if status != "OK" => DistanceError::ProviderStatus(status),
                None => DistanceError::MalformedResponse("missing rows[0].elements[0]".into()),
            });
        }
    };

    if element.status != "OK" {
        warn!("Google distance matrix element status {}", element.status);
        return Err(DistanceError::ProviderStatus(element.status.clone()));
    }

    let distance = element
        .distance
        .as_ref()
        .ok_or_else(|| DistanceError::MalformedResponse("element without distance".into()))?;
    let (duration_seconds, duration_text) = element
        .duration
        .as_ref()
        .map_or((0.0, String::new()), |d| (d.value, d.text.clone()));

    Ok(DistanceResult {
        kilometers: distance.value / 1000.0,
        distance_text: distance.text.clone(),
        duration_seconds,
        duration_text,
        provider_raw: body.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    rows: Vec<Row>,
    status: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    status: String,
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    #[serde(default)]
    text: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}
