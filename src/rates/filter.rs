use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ExclusivePair;
use crate::domain::ShippingRate;

/// Anything carrying a carrier code and a comparable amount.
pub trait PricedRate {
    fn carrier_code(&self) -> &str;
    fn amount(&self) -> f64;
}

impl PricedRate for ShippingRate {
    fn carrier_code(&self) -> &str {
        &self.carrier_code
    }

    fn amount(&self) -> f64 {
        self.price
    }
}

/// Which of the pair to drop, if both are present. Ties keep the
/// distance-based rate.
fn loser<'a>(pair: &'a ExclusivePair, distance_price: f64, direct_price: f64) -> &'a str {
    if distance_price <= direct_price {
        &pair.direct_vehicle
    } else {
        &pair.distance_based
    }
}

/// Keep only the cheaper of the two mutually exclusive carriers.
pub fn filter_exclusive<R: PricedRate>(mut rates: Vec<R>, pair: &ExclusivePair) -> Vec<R> {
    let price_of = |rates: &[R], code: &str| {
        rates
            .iter()
            .rev()
            .find(|r| r.carrier_code() == code)
            .map(|r| r.amount())
    };

    let distance_price = price_of(rates.as_slice(), &pair.distance_based);
    let direct_price = price_of(rates.as_slice(), &pair.direct_vehicle);

    if let (Some(distance_price), Some(direct_price)) = (distance_price, direct_price) {
        let drop = loser(pair, distance_price, direct_price).to_string();
        debug!(
            "Exclusive pair: distance {} vs direct {}, dropping {}",
            distance_price, direct_price, drop
        );
        rates.retain(|r| r.carrier_code() != drop);
    }
    rates
}

/// Same as [`filter_exclusive`] for rates grouped by carrier code; the losing
/// carrier's whole group is removed.
pub fn filter_exclusive_grouped<R: PricedRate>(
    mut grouped: BTreeMap<String, Vec<R>>,
    pair: &ExclusivePair,
) -> BTreeMap<String, Vec<R>> {
    let price_of = |grouped: &BTreeMap<String, Vec<R>>, code: &str| {
        grouped
            .get(code)
            .and_then(|rates| rates.iter().find(|r| r.carrier_code() == code))
            .map(|r| r.amount())
    };

    let distance_price = price_of(&grouped, &pair.distance_based);
    let direct_price = price_of(&grouped, &pair.direct_vehicle);

    if let (Some(distance_price), Some(direct_price)) = (distance_price, direct_price) {
        let drop = loser(pair, distance_price, direct_price).to_string();
        grouped.remove(&drop);
    }
    grouped
}
