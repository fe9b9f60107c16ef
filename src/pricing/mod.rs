pub mod flat_table;
pub mod formula;
pub mod strategy;
pub mod tables;
pub mod tiers;

use serde::Deserialize;

use crate::config::constant::CAPACITY_TIER_MAX_QTY;

pub use flat_table::{flat_table_price, greedy_cover_cost};
pub use formula::{load_factor_price, surcharge_price, LoadFactorParams, SurchargeFormula};
pub use strategy::{PricingInput, PricingStrategy};
pub use tables::{DeliveryTables, PalletRow, Tier, TierMode, TierTable, UnitPrice};
pub use tiers::{capacity_tier_price, distance_tier_price};

use strategy::{
    CapacityTierStrategy, DistanceTierStrategy, FlatTableStrategy, LoadFactorStrategy,
    SurchargeStrategy,
};

/// Pricing section of a carrier, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingConfig {
    FlatTable {
        delivers: Vec<Vec<UnitPrice>>,
        #[serde(default)]
        price_supplement: f64,
    },
    DistanceTier {
        table: TierTable,
    },
    CapacityTier {
        delivers: Vec<Vec<PalletRow>>,
        #[serde(default)]
        price_supplement: f64,
        #[serde(default = "default_base_km")]
        base_km: f64,
    },
    Surcharge(SurchargeFormula),
    LoadFactor(LoadFactorParams),
}

fn default_base_km() -> f64 {
    1.0
}

impl PricingConfig {
    pub fn build(&self) -> Box<dyn PricingStrategy> {
        match self {
            Self::FlatTable {
                delivers,
                price_supplement,
            } => Box::new(FlatTableStrategy {
                delivers: delivers.clone(),
                price_supplement: *price_supplement,
            }),
            Self::DistanceTier { table } => Box::new(DistanceTierStrategy::new(table.normalized())),
            Self::CapacityTier {
                delivers,
                price_supplement,
                base_km,
            } => Box::new(CapacityTierStrategy {
                delivers: delivers.clone(),
                price_supplement: *price_supplement,
                base_km: *base_km,
                max_quantity: CAPACITY_TIER_MAX_QTY,
            }),
            Self::Surcharge(formula) => Box::new(SurchargeStrategy(*formula)),
            Self::LoadFactor(params) => Box::new(LoadFactorStrategy(*params)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::FlatTable {
                delivers,
                price_supplement,
            } => {
                check_supplement(*price_supplement)?;
                if !delivers.iter().any(|rows| {
                    rows.iter()
                        .any(|r| r.m2.map_or(false, |m| m > 0.0) && r.price.is_some())
                }) {
                    return Err("flat table has no usable row".into());
                }
            }
            Self::DistanceTier { table } => {
                if table.normalized().is_empty() {
                    return Err("distance tier table has no usable tier".into());
                }
            }
            Self::CapacityTier {
                delivers,
                price_supplement,
                base_km,
            } => {
                check_supplement(*price_supplement)?;
                if *base_km <= 0.0 {
                    return Err("base_km must be positive".into());
                }
                if delivers.iter().all(|rows| rows.is_empty()) {
                    return Err("capacity table has no rows".into());
                }
            }
            Self::Surcharge(formula) => check_supplement(formula.percent_supplement)?,
            Self::LoadFactor(params) => {
                if params.factor_min > params.factor_max {
                    return Err("factor_min must not exceed factor_max".into());
                }
            }
        }
        Ok(())
    }
}

fn check_supplement(supplement: f64) -> Result<(), String> {
    if supplement <= -100.0 {
        return Err(format!("price supplement {} makes every price zero", supplement));
    }
    Ok(())
}
