pub mod google;
pub mod here;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{Coordinates, DistanceResult};
use crate::error::DistanceError;
use crate::utils::round_to;

pub use google::GoogleProvider;
pub use here::{encode_query, truck_query_params, HereProvider};

/// A geocoding + routing backend.
#[async_trait]
pub trait DistanceProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    async fn resolve_coordinates(&self, address: &str) -> Result<Coordinates, DistanceError>;

    async fn route_distance(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<DistanceResult, DistanceError>;
}

pub(crate) fn distance_text(meters: f64) -> String {
    format!("{} km", round_to(meters / 1000.0, 1))
}

pub(crate) fn duration_text(seconds: f64) -> String {
    format!("{} mins", (seconds / 60.0).round())
}
