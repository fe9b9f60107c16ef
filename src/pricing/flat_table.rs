use tracing::trace;

use super::tables::UnitPrice;

/// Cover `quantity` greedily with the table's breakpoints.
///
/// Each round buys, for every breakpoint, the number of units the remainder
/// calls for (one partial unit when the remainder is below the breakpoint,
/// whole units otherwise) and keeps the cheapest option, the later row
/// winning ties. Returns `None` when the table has no usable row.
pub fn greedy_cover_cost(quantity: f64, breakpoints: &[UnitPrice]) -> Option<f64> {
    let usable: Vec<(f64, f64)> = breakpoints
        .iter()
        .filter_map(|row| match (row.m2, row.price) {
            (Some(m2), Some(price)) if m2 > 0.0 && m2.is_finite() && price.is_finite() => {
                Some((m2, price))
            }
            _ => None,
        })
        .collect();
    if usable.is_empty() {
        return None;
    }

    let mut remaining = quantity;
    let mut amount = 0.0;
    while remaining > 0.0 {
        let mut best: Option<(f64, f64, f64)> = None;
        for &(m2, price) in &usable {
            let units = if remaining < m2 {
                (remaining / m2).ceil()
            } else {
                (remaining / m2).floor()
            };
            let cost = units * price;
            best = match best {
                Some(current) if current.2 < cost => Some(current),
                _ => Some((units, m2, cost)),
            };
        }

        let Some((units, m2, cost)) = best else { break };
        trace!("{} x {} m2 for {}", units, m2, cost);
        remaining -= units.floor() * m2;
        amount += cost;
    }
    Some(amount)
}

/// Cheapest of the carrier's alternative tables, with the percentage
/// supplement applied and rounded up.
pub fn flat_table_price(quantity: f64, delivers: &[Vec<UnitPrice>], price_supplement: f64) -> f64 {
    if !(quantity > 0.0) {
        return 0.0;
    }
    let factor = (100.0 + price_supplement) / 100.0;

    delivers
        .iter()
        .filter_map(|table| greedy_cover_cost(quantity, table))
        .map(|amount| (amount * factor).ceil())
        .fold(None, |min: Option<f64>, amount| {
            Some(min.map_or(amount, |m| m.min(amount)))
        })
        .unwrap_or(0.0)
}
