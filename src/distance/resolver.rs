use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use tracing::{debug, info, warn};

use super::providers::{DistanceProvider, GoogleProvider, HereProvider};
use crate::api::http_client::HttpClient;
use crate::config::{DistanceSettings, ProviderKind};
use crate::domain::{Coordinates, DistanceResult};
use crate::error::{ConfigError, DistanceError};

/// Build the configured provider.
pub fn create_provider(
    settings: &DistanceSettings,
    timeout: Duration,
) -> Result<Arc<dyn DistanceProvider>, ConfigError> {
    let http = HttpClient::new(timeout).map_err(|e| ConfigError::HttpClient(e.to_string()))?;
    info!("Using distance provider '{:?}'", settings.provider);

    let provider: Arc<dyn DistanceProvider> = match settings.provider {
        ProviderKind::Google => {
            let mut google = GoogleProvider::new(http, settings.google_api_key.clone());
            if let (Some(matrix), Some(geocode)) =
                (&settings.google_matrix_url, &settings.google_geocode_url)
            {
                google = google.with_urls(matrix.clone(), geocode.clone());
            }
            Arc::new(google)
        }
        ProviderKind::Here => {
            let mut here = HereProvider::new(
                http,
                settings.here_api_key.clone(),
                settings.truck.clone(),
            );
            if let (Some(geocode), Some(routes)) =
                (&settings.here_geocode_url, &settings.here_routes_url)
            {
                here = here.with_urls(geocode.clone(), routes.clone());
            }
            Arc::new(here)
        }
    };
    Ok(provider)
}

/// Distance lookups for a single quote request.
///
/// Results are memoized per (origin, destination) pair, failures included, so
/// every carrier sharing a route costs one provider call. Create one per
/// request and drop it afterwards.
#[derive(Debug)]
pub struct DistanceResolver {
    provider: Arc<dyn DistanceProvider>,
    routes: HashMap<(String, String), Result<DistanceResult, DistanceError>>,
    coordinates: HashMap<String, Option<Coordinates>>,
}

impl DistanceResolver {
    pub fn new(provider: Arc<dyn DistanceProvider>) -> Self {
        Self {
            provider,
            routes: HashMap::new(),
            coordinates: HashMap::new(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn distance_details(
        &mut self,
        origin: &str,
        destination: &str,
    ) -> Result<DistanceResult, DistanceError> {
        let key = (origin.to_string(), destination.to_string());
        if let Some(cached) = self.routes.get(&key) {
            debug!("Distance cache hit for '{}' -> '{}'", origin, destination);
            return cached.clone();
        }

        let result = self.provider.route_distance(origin, destination).await;
        self.routes.insert(key, result.clone());
        result
    }

    /// Kilometers between two addresses, `0.0` when the route can't be computed.
    pub async fn get_distance(&mut self, origin: &str, destination: &str) -> f64 {
        match self.distance_details(origin, destination).await {
            Ok(result) => result.kilometers,
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    "Could not calculate distance '{}' -> '{}': {}", origin, destination, e
                );
                0.0
            }
        }
    }

    /// Sum of consecutive legs. A failed leg fails the whole route.
    pub async fn get_distance_for_waypoints(&mut self, points: &[String]) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }

        let mut total = 0.0;
        for (from, to) in points.iter().tuple_windows() {
            match self.distance_details(from, to).await {
                Ok(leg) => total += leg.kilometers,
                Err(e) => {
                    warn!("Waypoint leg '{}' -> '{}' failed: {}", from, to, e);
                    return 0.0;
                }
            }
        }
        total
    }

    pub async fn coordinates(&mut self, address: &str) -> Option<Coordinates> {
        if let Some(cached) = self.coordinates.get(address) {
            return *cached;
        }

        let resolved = match self.provider.resolve_coordinates(address).await {
            Ok(coords) => Some(coords),
            Err(e) => {
                warn!("Could not geocode '{}': {}", address, e);
                None
            }
        };
        self.coordinates.insert(address.to_string(), resolved);
        resolved
    }
}
