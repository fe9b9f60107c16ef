use std::cmp::Ordering;

use super::tables::{PalletRow, Tier, TierMode};

/// Price of the highest tier whose threshold the distance reaches.
///
/// Tiers may come in any order. Negative or non-numeric distances and
/// distances below every threshold price at `0.0`.
pub fn distance_tier_price(distance_km: f64, tiers: &[Tier]) -> f64 {
    if !(distance_km >= 0.0) || !distance_km.is_finite() {
        return 0.0;
    }

    let mut ordered: Vec<&Tier> = tiers.iter().collect();
    ordered.sort_by(|a, b| b.min_distance.partial_cmp(&a.min_distance).unwrap_or(Ordering::Equal));

    ordered
        .into_iter()
        .find(|tier| distance_km >= tier.min_distance)
        .map(|tier| match tier.mode {
            TierMode::Fixed => tier.price,
            TierMode::PerKm => distance_km * tier.price,
        })
        .unwrap_or(0.0)
        .max(0.0)
}

/// Capacity row for `quantity`: the smallest one that still holds it,
/// otherwise the largest available.
fn pick_row(quantity: f64, rows: &[PalletRow]) -> Option<PalletRow> {
    let mut usable: Vec<PalletRow> = rows
        .iter()
        .copied()
        .filter(|row| row.m2.is_some() && (row.price.is_some() || row.full_price.is_some()))
        .collect();
    usable.sort_by(|a, b| {
        a.m2.unwrap_or_default()
            .partial_cmp(&b.m2.unwrap_or_default())
            .unwrap_or(Ordering::Equal)
    });

    usable
        .iter()
        .find(|row| row.m2.map_or(false, |m2| quantity <= m2))
        .or(usable.last())
        .copied()
}

fn row_amount(row: &PalletRow, distance_km: f64, base_km: f64, factor: f64) -> Option<f64> {
    let palette = row.palette.filter(|p| *p > 0.0)?;
    if let Some(full_price) = row.full_price {
        return Some((full_price * palette * factor).ceil());
    }

    let m2 = row.m2?;
    let price = row.price?;
    if base_km <= 0.0 {
        return None;
    }
    let per_km = m2 * price / palette / base_km;
    Some((distance_km * per_km / base_km * distance_km * palette * factor).ceil())
}

/// Distance priced from pallet capacity tables, cheapest alternative wins.
pub fn capacity_tier_price(
    quantity: f64,
    distance_km: f64,
    delivers: &[Vec<PalletRow>],
    price_supplement: f64,
    base_km: f64,
) -> f64 {
    if !(quantity > 0.0) || !(distance_km >= 0.0) {
        return 0.0;
    }
    let factor = (100.0 + price_supplement) / 100.0;

    delivers
        .iter()
        .filter_map(|rows| pick_row(quantity, rows))
        .filter_map(|row| row_amount(&row, distance_km, base_km, factor))
        .fold(None, |min: Option<f64>, amount| {
            Some(min.map_or(amount, |m| m.min(amount)))
        })
        .unwrap_or(0.0)
        .max(0.0)
}
