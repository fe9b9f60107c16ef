use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use super::currency::{convert_from_eur, CurrencyRates};
use super::request::{time_windows, Load, QuoteRequest, RequestParts, VehicleRequirements};
use super::throttle::BrokerThrottle;
use super::vehicle::{
    capacity_tons, load_meters, pallets_needed, resolve_vehicle_size, select_vehicle,
    DimensionTable, PalletDims,
};
use crate::api::broker::BrokerClient;
use crate::config::constant::{DEFAULT_M2_PER_PALLET, DEFAULT_WEIGHT_PER_UNIT_KG};
use crate::config::{BrokerSettings, FreightSettings};
use crate::domain::{Address, PriceBreakdown};
use crate::error::FreightError;
use crate::rates::tax::apply_tax_rounding;

/// Weight of one unit of a product, in kg.
pub trait UnitWeightSource: Send + Sync + fmt::Debug {
    fn unit_weight_kg(&self, sku: &str) -> Option<f64>;
}

impl UnitWeightSource for HashMap<String, f64> {
    fn unit_weight_kg(&self, sku: &str) -> Option<f64> {
        self.get(sku).copied()
    }
}

/// One carrier's request for a broker price.
#[derive(Debug, Clone, Copy)]
pub struct FreightContext<'a> {
    pub carrier_code: &'a str,
    pub freight: &'a FreightSettings,
    pub origin: &'a Address,
    pub destination: &'a Address,
    pub distance_km: f64,
    pub quantity: f64,
    pub tax_rate: f64,
}

/// Vehicle, pallets and weight worked out for a quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub vehicle_size_id: String,
    pub vehicle_bodies: Vec<String>,
    pub freight_type: String,
    pub pallets: u32,
    pub dims: PalletDims,
    pub load_meters: f64,
    pub weight_kg: f64,
    pub capacity_tons: u32,
}

#[derive(Debug, Clone)]
pub struct FreightQuoteResolver {
    client: BrokerClient,
    throttle: Arc<BrokerThrottle>,
    rates: Arc<dyn CurrencyRates>,
    weights: Arc<dyn UnitWeightSource>,
    dimensions: DimensionTable,
    settings: BrokerSettings,
    store_currency: String,
}

impl FreightQuoteResolver {
    pub fn new(
        client: BrokerClient,
        settings: BrokerSettings,
        store_currency: impl Into<String>,
        rates: Arc<dyn CurrencyRates>,
        weights: Arc<dyn UnitWeightSource>,
    ) -> Self {
        Self {
            client,
            throttle: BrokerThrottle::shared(),
            rates,
            weights,
            dimensions: DimensionTable::default(),
            settings,
            store_currency: store_currency.into(),
        }
    }

    pub fn with_throttle(mut self, throttle: Arc<BrokerThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_dimensions(mut self, dimensions: DimensionTable) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Broker price for the carrier, or `None` so the caller falls back to
    /// table pricing.
    pub async fn quote(&self, ctx: FreightContext<'_>) -> Option<PriceBreakdown> {
        match self.try_quote(ctx).await {
            Ok(breakdown) => {
                info!(
                    carrier = ctx.carrier_code,
                    "Broker price {:.2} net / {:.2} gross", breakdown.net_price, breakdown.gross_price
                );
                Some(breakdown)
            }
            Err(e) => {
                warn!(carrier = ctx.carrier_code, "Broker quote unavailable: {}", e);
                None
            }
        }
    }

    pub async fn try_quote(&self, ctx: FreightContext<'_>) -> Result<PriceBreakdown, FreightError> {
        if ctx.quantity <= 0.0 || ctx.distance_km <= 0.0 {
            return Err(FreightError::ConfigurationMissing(
                "positive quantity and distance".into(),
            ));
        }

        let plan = self.plan_load(ctx.freight, ctx.quantity)?;
        debug!(?plan, "Planned broker load");

        let request = QuoteRequest::build(RequestParts {
            company_id: self.settings.company_id,
            user_id: self.settings.user_id,
            distance_km: ctx.distance_km,
            load_meters: plan.load_meters,
            origin: ctx.origin,
            destination: ctx.destination,
            country: &self.settings.country,
            windows: time_windows(&Local, Local::now().date_naive()),
            load: Load {
                amount: plan.pallets,
                length: plan.dims.length,
                width: plan.dims.width,
                name: format!("{} ({} m2)", ctx.freight.load_name, ctx.quantity),
                type_of_load: ctx.freight.load_type.clone(),
                weight: plan.weight_kg / 1000.0,
            },
            vehicle: VehicleRequirements {
                capacity: plan.capacity_tons,
                gps: true,
                other_requirements: Vec::new(),
                required_truck_bodies: plan.vehicle_bodies.clone(),
                required_ways_of_loading: Vec::new(),
                vehicle_size_id: plan.vehicle_size_id.clone(),
                transport_type: plan.freight_type.clone(),
            },
        });

        self.throttle.wait().await;
        let prediction = self.client.predict_price(&request).await?;
        let eur = prediction.eur_price()? * ctx.freight.price_factor;
        let net = convert_from_eur(eur, &self.store_currency, self.rates.as_ref())?;

        Ok(apply_tax_rounding(net, ctx.tax_rate))
    }

    /// Choose vehicle and pallet layout for `quantity` square metres.
    pub fn plan_load(&self, freight: &FreightSettings, quantity: f64) -> Result<LoadPlan, FreightError> {
        let unit_weight = freight
            .reference_sku
            .as_deref()
            .and_then(|sku| self.weights.unit_weight_kg(sku))
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_WEIGHT_PER_UNIT_KG);
        let weight_kg = quantity * unit_weight;

        let (vehicle_size_id, vehicle_bodies, pallets, dims, freight_type) =
            match select_vehicle(&freight.vehicle_rules, quantity) {
                Some((rule, pallets)) => (
                    resolve_vehicle_size(&rule.vehicle_sizes)?,
                    rule.vehicle_bodies.clone(),
                    pallets,
                    rule.pallet_dims()
                        .unwrap_or_else(|| self.dimensions.lookup(&freight.load_type)),
                    rule.freight_type
                        .clone()
                        .unwrap_or_else(|| freight.freight_type.clone()),
                ),
                None => {
                    let size = freight
                        .vehicle_size
                        .clone()
                        .ok_or_else(|| FreightError::ConfigurationMissing("vehicle size".into()))?;
                    let bodies = freight.vehicle_body.iter().cloned().collect::<Vec<_>>();
                    let pallets = pallets_needed(quantity, DEFAULT_M2_PER_PALLET).unwrap_or(1);
                    (
                        size,
                        bodies,
                        pallets,
                        self.dimensions.lookup(&freight.load_type),
                        freight.freight_type.clone(),
                    )
                }
            };

        if vehicle_bodies.is_empty() {
            return Err(FreightError::ConfigurationMissing("vehicle body".into()));
        }

        Ok(LoadPlan {
            vehicle_size_id,
            vehicle_bodies,
            freight_type,
            pallets,
            dims,
            load_meters: load_meters(pallets, dims),
            weight_kg,
            capacity_tons: capacity_tons(weight_kg),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http_client::HttpClient;
    use crate::freight::currency::StaticRates;
    use crate::freight::vehicle::VehicleRule;
    use std::time::Duration;

    fn freight(rules: Vec<VehicleRule>) -> FreightSettings {
        FreightSettings {
            enabled: true,
            vehicle_rules: rules,
            vehicle_size: Some("3_lorry".into()),
            vehicle_body: Some("curtainsider".into()),
            load_type: "2_europalette".into(),
            freight_type: "ftl".into(),
            load_name: "Turf".into(),
            price_factor: 1.0,
            reference_sku: Some("TURF".into()),
            geocode_spots: false,
        }
    }

    fn resolver(weights: HashMap<String, f64>) -> FreightQuoteResolver {
        let http = HttpClient::new(Duration::from_secs(5)).unwrap();
        FreightQuoteResolver::new(
            BrokerClient::new(http, None, None, None),
            BrokerSettings::default(),
            "PLN",
            Arc::new(StaticRates::default()),
            Arc::new(weights),
        )
    }

    #[test]
    fn static_fallback_when_no_rule_fits() {
        let plan = resolver(HashMap::new()).plan_load(&freight(vec![]), 120.0).unwrap();

        assert_eq!(plan.vehicle_size_id, "3_lorry");
        assert_eq!(plan.vehicle_bodies, vec!["curtainsider".to_string()]);
        assert_eq!(plan.pallets, 3);
        assert_eq!(plan.weight_kg, 3000.0);
        assert_eq!(plan.capacity_tons, 3);
        assert_eq!(plan.load_meters, 1.2);
    }

    #[test]
    fn rule_overrides_static_vehicle() {
        let rule = VehicleRule {
            max_pallets: 6,
            m2_per_pallet: 40.0,
            vehicle_sizes: ["1_bus".to_string(), "5_solo".to_string()].into(),
            vehicle_bodies: vec!["box".into()],
            pallet_length: Some(1.2),
            pallet_width: Some(1.0),
            freight_type: Some("ltl".into()),
        };
        let mut weights = HashMap::new();
        weights.insert("TURF".to_string(), 30.0);

        let plan = resolver(weights).plan_load(&freight(vec![rule]), 100.0).unwrap();

        assert_eq!(plan.vehicle_size_id, "13_bus_lorry_solo");
        assert_eq!(plan.vehicle_bodies, vec!["box".to_string()]);
        assert_eq!(plan.freight_type, "ltl");
        assert_eq!(plan.pallets, 3);
        assert_eq!(plan.dims, PalletDims { length: 1.2, width: 1.0 });
        assert_eq!(plan.weight_kg, 3000.0);
    }

    #[test]
    fn missing_vehicle_configuration_fails() {
        let mut settings = freight(vec![]);
        settings.vehicle_size = None;
        assert!(matches!(
            resolver(HashMap::new()).plan_load(&settings, 10.0),
            Err(FreightError::ConfigurationMissing(_))
        ));

        let mut settings = freight(vec![]);
        settings.vehicle_body = None;
        assert!(resolver(HashMap::new()).plan_load(&settings, 10.0).is_err());
    }
}
