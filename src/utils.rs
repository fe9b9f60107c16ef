/// Float noise below this is ignored when rounding money up.
const MONEY_EPSILON: f64 = 1e-9;

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Ceil to a whole currency unit without turning `123.00000000000001` into 124.
pub fn ceil_money(value: f64) -> f64 {
    (value - MONEY_EPSILON).ceil()
}

/// Usable when finite and strictly positive.
pub fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}
