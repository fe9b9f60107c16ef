use std::fmt;

use thiserror::Error;

/// Which side of a route a geocoding failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin => write!(f, "Origin"),
            Self::Destination => write!(f, "Destination"),
        }
    }
}

/// Failures of the geocoding / routing providers.
///
/// None of these cross the pricing pipeline: the distance resolver logs them
/// and reports a zero distance instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistanceError {
    #[error("{provider} API key is missing")]
    MissingCredentials { provider: &'static str },

    #[error("missing origin or destination address")]
    MissingAddress,

    #[error("geocoding failed: {0}")]
    GeocodingFailed(String),

    #[error("{endpoint} Geocoding Error: {message}")]
    Geocoding { endpoint: Endpoint, message: String },

    #[error("routing failed: {0}")]
    RoutingFailed(String),

    #[error("provider returned status {0}")]
    ProviderStatus(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("http request failed: {0}")]
    Http(String),
}

/// Failures while asking the freight broker for a price.
///
/// Every variant makes the carrier fall back to its table pricing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FreightError {
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("cannot resolve a single vehicle size from {0:?}")]
    UnresolvableVehicleSize(Vec<String>),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("malformed broker response: {0}")]
    MalformedResponse(String),

    #[error("no exchange rate between EUR and {0}")]
    CurrencyConversion(String),

    #[error("{endpoint} spot could not be geocoded: '{address}'")]
    Geocoding { endpoint: Endpoint, address: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("cannot build http client: {0}")]
    HttpClient(String),
}
