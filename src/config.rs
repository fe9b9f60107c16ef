use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use dotenv::dotenv;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::freight::currency::StaticRates;
use crate::freight::vehicle::VehicleRule;
use crate::pricing::PricingConfig;

pub mod constant {
    pub(crate) const DEFAULT_CONFIG_PATH: &str = "shipping.toml";
    pub(crate) const HTTP_TIMEOUT_SECS: u64 = 30;

    /// Shortest destination string worth routing.
    pub(crate) const MIN_DESTINATION_LEN: usize = 5;

    pub(crate) const DEFAULT_WEIGHT_PER_UNIT_KG: f64 = 25.0;
    pub(crate) const DEFAULT_M2_PER_PALLET: f64 = 50.0;
    pub(crate) const DEFAULT_PALLET_LENGTH_M: f64 = 1.2;
    pub(crate) const DEFAULT_PALLET_WIDTH_M: f64 = 0.8;
    pub(crate) const TRAILER_WIDTH_M: f64 = 2.4;
    pub(crate) const MIN_LOAD_METERS: f64 = 0.1;
    pub(crate) const DEFAULT_LOAD_TYPE: &str = "2_europalette";
    pub(crate) const DEFAULT_FREIGHT_TYPE: &str = "ftl";
    pub(crate) const DEFAULT_COUNTRY: &str = "PL";

    pub(crate) const BROKER_MIN_INTERVAL_MS: u64 = 1000;
    pub(crate) const BROKER_CURRENCY: &str = "EUR";
    pub(crate) const PICKUP_DAY_OFFSET: i64 = 1;
    pub(crate) const DELIVERY_DAY_OFFSET: i64 = 2;
    pub(crate) const WINDOW_START_HOUR: u32 = 8;
    pub(crate) const WINDOW_END_HOUR: u32 = 16;

    /// Capacity-tier carriers without an explicit limit stop here.
    pub(crate) const CAPACITY_TIER_MAX_QTY: f64 = 950.0;

    pub(crate) const DISTANCE_BASED_CARRIER: &str = "distanceshipping";
    pub(crate) const DIRECT_VEHICLE_CARRIER: &str = "direct_no_lift";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Here,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSettings {
    pub warehouse_origin: String,
    #[serde(default = "default_store_currency")]
    pub store_currency: String,
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,
}

/// Truck attributes forwarded to the truck-routing provider.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TruckProfile {
    pub height_m: Option<f64>,
    pub width_m: Option<f64>,
    pub length_m: Option<f64>,
    pub gross_weight_kg: Option<f64>,
    pub weight_per_axle_kg: Option<f64>,
    pub axle_count: Option<u32>,
    #[serde(default)]
    pub hazardous_goods: Vec<String>,
    #[serde(default)]
    pub avoid_features: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceSettings {
    pub provider: ProviderKind,
    pub google_api_key: Option<String>,
    pub here_api_key: Option<String>,
    #[serde(default)]
    pub truck: TruckProfile,
    pub google_matrix_url: Option<String>,
    pub google_geocode_url: Option<String>,
    pub here_geocode_url: Option<String>,
    pub here_routes_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxSettings {
    /// Percent, e.g. 23 for 23%.
    #[serde(default)]
    pub shipping_tax_rate: f64,
    #[serde(default)]
    pub shipping_includes_tax: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    #[serde(default)]
    pub company_id: u64,
    #[serde(default)]
    pub user_id: u64,
    pub prediction_url: Option<String>,
    pub access_token: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_broker_interval")]
    pub min_interval_ms: u64,
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            company_id: 0,
            user_id: 0,
            prediction_url: None,
            access_token: None,
            api_key: None,
            min_interval_ms: constant::BROKER_MIN_INTERVAL_MS,
            country: constant::DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Per-carrier freight broker options.
#[derive(Debug, Clone, Deserialize)]
pub struct FreightSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub vehicle_rules: Vec<VehicleRule>,
    /// Used when no rule fits the quantity.
    pub vehicle_size: Option<String>,
    pub vehicle_body: Option<String>,
    #[serde(default = "default_load_type")]
    pub load_type: String,
    #[serde(default = "default_freight_type")]
    pub freight_type: String,
    #[serde(default = "default_load_name")]
    pub load_name: String,
    #[serde(default = "default_factor")]
    pub price_factor: f64,
    pub reference_sku: Option<String>,
    #[serde(default)]
    pub geocode_spots: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarrierSettings {
    pub code: String,
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Zero means unlimited.
    #[serde(default)]
    pub max_qty: f64,
    pub specific_origin: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<String>,
    pub pricing: PricingConfig,
    pub freight: Option<FreightSettings>,
}

/// Message shown on a carrier's rate once the quantity reaches `min_quantity`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromotionSettings {
    pub carrier: String,
    pub min_quantity: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExclusivePair {
    pub distance_based: String,
    pub direct_vehicle: String,
}

impl Default for ExclusivePair {
    fn default() -> Self {
        Self {
            distance_based: constant::DISTANCE_BASED_CARRIER.to_string(),
            direct_vehicle: constant::DIRECT_VEHICLE_CARRIER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub general: GeneralSettings,
    pub distance: DistanceSettings,
    #[serde(default)]
    pub tax: TaxSettings,
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub currency: StaticRates,
    /// Weight in kg of one unit of a product, by SKU.
    #[serde(default)]
    pub unit_weights: HashMap<String, f64>,
    #[serde(default)]
    pub exclusive_pair: ExclusivePair,
    #[serde(default)]
    pub promotions: Vec<PromotionSettings>,
    #[serde(default)]
    pub carriers: Vec<CarrierSettings>,
}

impl Settings {
    /// Load from `$SHIPPING_CONFIG`, falling back to `shipping.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        let path = env::var("SHIPPING_CONFIG")
            .unwrap_or_else(|_| constant::DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&raw)?;
        settings.apply_env_overrides();
        settings.validate()?;
        info!(
            "Loaded {} carriers from {} (provider {:?})",
            settings.carriers.len(),
            path.display(),
            settings.distance.provider
        );
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("GOOGLE_API_KEY") {
            info!("Loaded Google Maps API key from environment");
            self.distance.google_api_key = Some(key);
        }
        if let Ok(key) = env::var("HERE_API_KEY") {
            info!("Loaded HERE API key from environment");
            self.distance.here_api_key = Some(key);
        }
        if let Ok(token) = env::var("TRANSEU_ACCESS_TOKEN") {
            debug!("Loaded broker access token from environment");
            self.broker.access_token = Some(token);
        }
        if let Ok(key) = env::var("TRANSEU_API_KEY") {
            debug!("Loaded broker api key from environment");
            self.broker.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.warehouse_origin.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "general.warehouse_origin must not be empty".into(),
            ));
        }
        if self.general.store_currency.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "general.store_currency must not be empty".into(),
            ));
        }
        if !(0.0..100.0).contains(&self.tax.shipping_tax_rate) {
            return Err(ConfigError::Invalid(format!(
                "tax.shipping_tax_rate {} out of range",
                self.tax.shipping_tax_rate
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for carrier in &self.carriers {
            if !seen.insert(carrier.code.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate carrier code '{}'",
                    carrier.code
                )));
            }
            if carrier.max_qty < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "carrier '{}': max_qty must not be negative",
                    carrier.code
                )));
            }
            carrier.pricing.validate().map_err(|reason| {
                ConfigError::Invalid(format!("carrier '{}': {}", carrier.code, reason))
            })?;
            if let Some(freight) = carrier.freight.as_ref().filter(|f| f.enabled) {
                if freight.price_factor <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "carrier '{}': freight.price_factor must be positive",
                        carrier.code
                    )));
                }
                if let Some(rule) = freight.vehicle_rules.iter().find(|r| r.m2_per_pallet <= 0.0) {
                    return Err(ConfigError::Invalid(format!(
                        "carrier '{}': vehicle rule for {} pallets has no usable m2_per_pallet",
                        carrier.code, rule.max_pallets
                    )));
                }
                if let Some(rule) = freight.vehicle_rules.iter().find(|r| {
                    r.pallet_length.map_or(false, |l| l <= 0.0)
                        || r.pallet_width.map_or(false, |w| w <= 0.0)
                }) {
                    return Err(ConfigError::Invalid(format!(
                        "carrier '{}': vehicle rule for {} pallets has a non-positive pallet size",
                        carrier.code, rule.max_pallets
                    )));
                }
                if freight.vehicle_rules.is_empty()
                    && (freight.vehicle_size.is_none() || freight.vehicle_body.is_none())
                {
                    return Err(ConfigError::Invalid(format!(
                        "carrier '{}': freight needs vehicle_rules or both vehicle_size and vehicle_body",
                        carrier.code
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn carrier(&self, code: &str) -> Option<&CarrierSettings> {
        self.carriers.iter().find(|c| c.code == code)
    }
}

fn default_store_currency() -> String {
    "PLN".to_string()
}

fn default_timeout() -> u64 {
    constant::HTTP_TIMEOUT_SECS
}

fn default_broker_interval() -> u64 {
    constant::BROKER_MIN_INTERVAL_MS
}

fn default_country() -> String {
    constant::DEFAULT_COUNTRY.to_string()
}

fn default_load_type() -> String {
    constant::DEFAULT_LOAD_TYPE.to_string()
}

fn default_freight_type() -> String {
    constant::DEFAULT_FREIGHT_TYPE.to_string()
}

fn default_load_name() -> String {
    "Goods".to_string()
}

fn default_factor() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}
