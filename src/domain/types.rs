use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// `lat,lng` as the routing API expects it.
    pub fn as_query(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// An address as typed by the customer, plus whatever was learned about it
/// while computing one quote. Never outlives the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub text: String,
    pub coordinates: Option<Coordinates>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl Address {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_locality(mut self, city: impl Into<String>, postal_code: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.postal_code = Some(postal_code.into());
        self
    }
}

/// Travel distance between one origin/destination pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceResult {
    pub kilometers: f64,
    pub distance_text: String,
    pub duration_seconds: f64,
    pub duration_text: String,
    pub provider_raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Table,
    Broker,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Broker => "broker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub net_price: f64,
    pub gross_price: f64,
    pub tax_rate: f64,
    pub source: PriceSource,
}

/// One priced shipping option, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingRate {
    pub carrier_code: String,
    pub carrier_title: String,
    pub method_title: String,
    pub description: String,
    pub price: f64,
    pub distance_km: Option<f64>,
    pub breakdown: PriceBreakdown,
    pub formatted_price_net: String,
    pub formatted_price_gross: String,
    pub promotion: Option<String>,
}
