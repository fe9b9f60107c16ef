use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};
use url::form_urlencoded::byte_serialize;

use super::{distance_text, duration_text, DistanceProvider};
use crate::api::http_client::HttpClient;
use crate::config::TruckProfile;
use crate::domain::{Coordinates, DistanceResult};
use crate::error::{DistanceError, Endpoint};

pub const GEOCODE_URL: &str = "https://geocode.search.hereapi.com/v1/geocode";
pub const ROUTES_URL: &str = "https://router.hereapi.com/v8/routes";

/// HERE geocoding plus truck routing.
#[derive(Debug, Clone)]
pub struct HereProvider {
    http: HttpClient,
    api_key: Option<String>,
    truck: TruckProfile,
    geocode_url: String,
    routes_url: String,
}

impl HereProvider {
    pub fn new(http: HttpClient, api_key: Option<String>, truck: TruckProfile) -> Self {
        Self {
            http,
            api_key,
            truck,
            geocode_url: GEOCODE_URL.to_string(),
            routes_url: ROUTES_URL.to_string(),
        }
    }

    pub fn with_urls(mut self, geocode_url: impl Into<String>, routes_url: impl Into<String>) -> Self {
        self.geocode_url = geocode_url.into();
        self.routes_url = routes_url.into();
        self
    }

    fn api_key(&self) -> Result<&str, DistanceError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(DistanceError::MissingCredentials { provider: "HERE" })
    }

    /// Truck route between two already geocoded points.
    pub async fn route_between(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<DistanceResult, DistanceError> {
        let key = self.api_key()?;

        let mut params = vec![
            ("transportMode".to_string(), "truck".to_string()),
            ("origin".to_string(), origin.as_query()),
            ("destination".to_string(), destination.as_query()),
            ("return".to_string(), "summary".to_string()),
            ("apiKey".to_string(), key.to_string()),
        ];
        params.extend(truck_query_params(&self.truck));

        let url = format!("{}?{}", self.routes_url, encode_query(&params));
        trace!("Built HERE routes URL ({} chars)", url.len());
        info!("Sending truck route request to HERE");

        let response = self.http.get_url(&url).await.map_err(|e| {
            error!("HERE routes request failed: {}", e);
            DistanceError::Http(e)
        })?;

        let json: Value = serde_json::from_str(&response.body).map_err(|e| {
            error!(
                "Failed to parse HERE routes JSON: {} (first 200 chars: {})",
                e,
                response.preview()
            );
            DistanceError::MalformedResponse(e.to_string())
        })?;

        let summary = &json["routes"][0]["sections"][0]["summary"];
        match summary["length"].as_f64() {
            Some(length) => {
                let duration = summary["duration"].as_f64().unwrap_or(0.0);
                debug!("HERE route: {} m, {} s", length, duration);
                Ok(DistanceResult {
                    kilometers: length / 1000.0,
                    distance_text: distance_text(length),
                    duration_seconds: duration,
                    duration_text: duration_text(duration),
                    provider_raw: response.body,
                })
            }
            None => match json["title"].as_str() {
                Some(title) => {
                    let cause = json["cause"].as_str().unwrap_or_default();
                    warn!("HERE routing rejected: {}: {}", title, cause);
                    Err(DistanceError::RoutingFailed(format!("{}: {}", title, cause)))
                }
                None => {
                    error!(
                        "No route summary in HERE response. Keys: {:?}",
                        json.as_object().map(|o| o.keys().collect::<Vec<_>>())
                    );
                    Err(DistanceError::MalformedResponse(
                        "missing routes[0].sections[0].summary".into(),
                    ))
                }
            },
        }
    }
}

#[async_trait]
impl DistanceProvider for HereProvider {
    fn name(&self) -> &'static str {
        "here"
    }

    async fn resolve_coordinates(&self, address: &str) -> Result<Coordinates, DistanceError> {
        let key = self.api_key()?;
        let response = self
            .http
            .get_with_params(&self.geocode_url, &[("q", address), ("apiKey", key)])
            .await
            .map_err(DistanceError::Http)?;

        let json: Value = serde_json::from_str(&response.body)
            .map_err(|e| DistanceError::MalformedResponse(e.to_string()))?;

        let position = &json["items"][0]["position"];
        match (position["lat"].as_f64(), position["lng"].as_f64()) {
            (Some(lat), Some(lng)) => Ok(Coordinates { lat, lng }),
            _ => {
                let message = json["title"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Address not found".to_string());
                Err(DistanceError::GeocodingFailed(message))
            }
        }
    }

    async fn route_distance(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<DistanceResult, DistanceError> {
        self.api_key()?;
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Err(DistanceError::MissingAddress);
        }

        let (from, to) = futures::join!(
            self.resolve_coordinates(origin),
            self.resolve_coordinates(destination)
        );

        let from = from.map_err(|e| DistanceError::Geocoding {
            endpoint: Endpoint::Origin,
            message: e.to_string(),
        })?;
        let to = to.map_err(|e| DistanceError::Geocoding {
            endpoint: Endpoint::Destination,
            message: e.to_string(),
        })?;

        self.route_between(from, to).await
    }
}

/// Truck restriction parameters. Dimensions go out in centimetres, unset or
/// zero values are left out entirely.
pub fn truck_query_params(truck: &TruckProfile) -> Vec<(String, String)> {
    let mut params = Vec::new();

    let dimensions = [
        ("vehicle[height]", truck.height_m),
        ("vehicle[width]", truck.width_m),
        ("vehicle[length]", truck.length_m),
    ];
    for (name, meters) in dimensions {
        if let Some(m) = meters.filter(|m| *m > 0.0) {
            params.push((name.to_string(), ((m * 100.0) as i64).to_string()));
        }
    }

    if let Some(kg) = truck.gross_weight_kg.filter(|w| *w > 0.0) {
        params.push(("vehicle[grossWeight]".to_string(), (kg as i64).to_string()));
    }
    if let Some(kg) = truck.weight_per_axle_kg.filter(|w| *w > 0.0) {
        params.push(("vehicle[weightPerAxle]".to_string(), (kg as i64).to_string()));
    }
    if let Some(axles) = truck.axle_count.filter(|a| *a > 0) {
        params.push(("vehicle[axleCount]".to_string(), axles.to_string()));
    }

    if let Some(goods) = join_tokens(&truck.hazardous_goods) {
        params.push(("shippedHazardousGoods".to_string(), goods));
    }
    if let Some(features) = join_tokens(&truck.avoid_features) {
        params.push(("avoid[features]".to_string(), features));
    }

    params
}

fn join_tokens(tokens: &[String]) -> Option<String> {
    let joined = tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    (!joined.is_empty()).then_some(joined)
}

/// RFC 3986 style query string, with `,` `[` `]` left readable since the
/// routing API rejects them escaped.
pub fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(raw: &str) -> String {
    byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace("%2C", ",")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> TruckProfile {
        TruckProfile {
            height_m: Some(4.0),
            width_m: Some(2.55),
            length_m: None,
            gross_weight_kg: Some(40000.0),
            weight_per_axle_kg: Some(0.0),
            axle_count: Some(5),
            hazardous_goods: vec!["explosive".into(), " flammable ".into()],
            avoid_features: vec![],
        }
    }

    #[test]
    fn truck_params_skip_unset_values() {
        let params = truck_query_params(&profile());
        let names: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "vehicle[height]",
                "vehicle[width]",
                "vehicle[grossWeight]",
                "vehicle[axleCount]",
                "shippedHazardousGoods"
            ]
        );
        assert_eq!(params[0].1, "400");
        assert_eq!(params[1].1, "254");
        assert_eq!(params[4].1, "explosive,flammable");
    }

    #[test]
    fn empty_profile_adds_nothing() {
        assert!(truck_query_params(&TruckProfile::default()).is_empty());
    }

    #[test]
    fn query_keeps_brackets_and_commas() {
        let params = vec![
            ("origin".to_string(), "52.4,16.9".to_string()),
            ("vehicle[height]".to_string(), "400".to_string()),
            ("avoid[features]".to_string(), "tollRoad,ferry".to_string()),
            ("q".to_string(), "ul. Polna 1 & 2".to_string()),
        ];
        assert_eq!(
            encode_query(&params),
            "origin=52.4,16.9&vehicle[height]=400&avoid[features]=tollRoad,ferry&q=ul.%20Polna%201%20%26%202"
        );
    }
}
