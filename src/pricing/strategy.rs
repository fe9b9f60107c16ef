use std::fmt;

use super::flat_table::flat_table_price;
use super::formula::{load_factor_price, surcharge_price, LoadFactorParams, SurchargeFormula};
use super::tables::{PalletRow, Tier, UnitPrice};
use super::tiers::{capacity_tier_price, distance_tier_price};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingInput {
    pub distance_km: f64,
    pub quantity: f64,
}

/// How a carrier turns distance and quantity into a price.
///
/// A price of `0.0` or less means the carrier does not apply.
pub trait PricingStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn price(&self, input: PricingInput) -> f64;

    /// Strategies that ignore distance let the carrier skip routing.
    fn uses_distance(&self) -> bool {
        true
    }

    /// Quantity limit applied when the carrier configures none.
    fn default_max_quantity(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct FlatTableStrategy {
    pub delivers: Vec<Vec<UnitPrice>>,
    pub price_supplement: f64,
}

impl PricingStrategy for FlatTableStrategy {
    fn name(&self) -> &'static str {
        "flat_table"
    }

    fn price(&self, input: PricingInput) -> f64 {
        flat_table_price(input.quantity, &self.delivers, self.price_supplement)
    }

    fn uses_distance(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct DistanceTierStrategy {
    tiers: Vec<Tier>,
}

impl DistanceTierStrategy {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }
}

impl PricingStrategy for DistanceTierStrategy {
    fn name(&self) -> &'static str {
        "distance_tier"
    }

    fn price(&self, input: PricingInput) -> f64 {
        distance_tier_price(input.distance_km, &self.tiers)
    }
}

#[derive(Debug, Clone)]
pub struct CapacityTierStrategy {
    pub delivers: Vec<Vec<PalletRow>>,
    pub price_supplement: f64,
    pub base_km: f64,
    pub max_quantity: f64,
}

impl PricingStrategy for CapacityTierStrategy {
    fn name(&self) -> &'static str {
        "capacity_tier"
    }

    fn price(&self, input: PricingInput) -> f64 {
        capacity_tier_price(
            input.quantity,
            input.distance_km,
            &self.delivers,
            self.price_supplement,
            self.base_km,
        )
    }

    fn default_max_quantity(&self) -> Option<f64> {
        Some(self.max_quantity)
    }
}

#[derive(Debug, Clone)]
pub struct SurchargeStrategy(pub SurchargeFormula);

impl PricingStrategy for SurchargeStrategy {
    fn name(&self) -> &'static str {
        "surcharge"
    }

    fn price(&self, input: PricingInput) -> f64 {
        surcharge_price(input.distance_km, &self.0)
    }
}

#[derive(Debug, Clone)]
pub struct LoadFactorStrategy(pub LoadFactorParams);

impl PricingStrategy for LoadFactorStrategy {
    fn name(&self) -> &'static str {
        "load_factor"
    }

    fn price(&self, input: PricingInput) -> f64 {
        load_factor_price(input.distance_km, input.quantity, &self.0)
    }
}
