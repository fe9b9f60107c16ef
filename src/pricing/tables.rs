//! Table shapes stored in carrier configuration.
//!
//! Rows are read leniently: numbers may arrive as strings, fields may be
//! missing. Incomplete rows are kept at parse time and skipped at pricing
//! time.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// One step of a flat quantity table: `m2` square metres cost `price`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct UnitPrice {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub m2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
}

impl UnitPrice {
    pub fn new(m2: f64, price: f64) -> Self {
        Self {
            m2: Some(m2),
            price: Some(price),
        }
    }
}

/// A capacity row of a distance-based pallet table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PalletRow {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub m2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub palette: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub full_price: Option<f64>,
}

/// Alternative tables of a carrier, each a list of rows. Stored as
/// `{"delivers": [[...], [...]]}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeliveryTables<R> {
    #[serde(default = "Vec::new")]
    pub delivers: Vec<Vec<R>>,
}

impl<R: for<'de> Deserialize<'de>> DeliveryTables<R> {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierMode {
    Fixed,
    PerKm,
}

impl TierMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "fixed" => Some(Self::Fixed),
            "per_km" => Some(Self::PerKm),
            _ => None,
        }
    }
}

/// A usable distance tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub min_distance: f64,
    pub price: f64,
    pub mode: TierMode,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TierRow {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min_distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl TierRow {
    fn to_tier(&self) -> Option<Tier> {
        Some(Tier {
            min_distance: self.min_distance.filter(|d| d.is_finite())?,
            price: self.price.filter(|p| p.is_finite())?,
            mode: TierMode::parse(self.kind.as_deref()?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TierRows {
    List(Vec<TierRow>),
    /// Row map keyed by an opaque row id, as saved by admin grids.
    Keyed(BTreeMap<String, TierRow>),
}

/// Distance tier table, either `{"tiers": [...]}` or the bare rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TierTable {
    Wrapped { tiers: TierRows },
    Rows(TierRows),
}

impl TierTable {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn rows(&self) -> Vec<&TierRow> {
        let rows = match self {
            Self::Wrapped { tiers } => tiers,
            Self::Rows(rows) => rows,
        };
        match rows {
            TierRows::List(list) => list.iter().collect(),
            TierRows::Keyed(map) => map.values().collect(),
        }
    }

    /// Complete rows only. Missing fields or an unknown `type` drop the row.
    pub fn normalized(&self) -> Vec<Tier> {
        self.rows().into_iter().filter_map(TierRow::to_tier).collect()
    }
}
