use serde::Deserialize;

/// Base cost plus a per-km surcharge past the free distance, then a
/// percentage supplement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SurchargeFormula {
    #[serde(default)]
    pub base_cost: f64,
    #[serde(default)]
    pub free_distance_km: f64,
    #[serde(default)]
    pub surcharge_per_km: f64,
    #[serde(default)]
    pub percent_supplement: f64,
}

pub fn surcharge_price(distance_km: f64, formula: &SurchargeFormula) -> f64 {
    if !(distance_km >= 0.0) {
        return 0.0;
    }
    let extra_km = (distance_km - formula.free_distance_km).max(0.0);
    let price = (formula.base_cost + extra_km * formula.surcharge_per_km)
        * (1.0 + formula.percent_supplement / 100.0);
    price.max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LoadFactorParams {
    #[serde(default)]
    pub price_per_km: f64,
    #[serde(default = "default_factor_min")]
    pub factor_min: f64,
    #[serde(default = "default_factor_max")]
    pub factor_max: f64,
    #[serde(default = "default_max_load")]
    pub max_load: f64,
}

impl Default for LoadFactorParams {
    fn default() -> Self {
        Self {
            price_per_km: 0.0,
            factor_min: default_factor_min(),
            factor_max: default_factor_max(),
            max_load: default_max_load(),
        }
    }
}

fn default_factor_min() -> f64 {
    1.0
}

fn default_factor_max() -> f64 {
    1.5
}

fn default_max_load() -> f64 {
    100.0
}

/// Per-km price scaled by how much of the vehicle the load occupies.
///
/// `load_factor = max_load / quantity`; the multiplier runs from
/// `factor_max` toward `factor_min` as the load fills the vehicle.
pub fn load_factor_price(distance_km: f64, quantity: f64, params: &LoadFactorParams) -> f64 {
    if params.price_per_km <= 0.0
        || params.max_load <= 0.0
        || !(quantity > 0.0)
        || !(distance_km >= 0.0)
    {
        return 0.0;
    }

    let load_factor = params.max_load / quantity;
    let factor = params.factor_max - (params.factor_max - params.factor_min) / load_factor;
    let price = (params.price_per_km * factor * distance_km * load_factor).ceil();
    if price > 0.0 {
        price
    } else {
        0.0
    }
}
