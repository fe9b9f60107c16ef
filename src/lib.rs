pub mod api;
pub mod cli;
pub mod config;
pub mod distance;
pub mod domain;
pub mod error;
pub mod freight;
pub mod pricing;
pub mod rates;
pub mod utils;

pub use config::Settings;
pub use domain::{PriceBreakdown, PriceSource, ShippingRate};
pub use error::{ConfigError, DistanceError, FreightError};
pub use rates::RateAggregator;
