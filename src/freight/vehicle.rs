use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::config::constant::{
    DEFAULT_M2_PER_PALLET, DEFAULT_PALLET_LENGTH_M, DEFAULT_PALLET_WIDTH_M, MIN_LOAD_METERS,
    TRAILER_WIDTH_M,
};
use crate::error::FreightError;
use crate::utils::round_to;

/// Vehicle sizes a rule may list together and the broker id they collapse to.
const COMPOSITE_SIZES: &[(&[&str], &str)] = &[
    (&["bus", "lorry", "solo"], "13_bus_lorry_solo"),
    (&["bus", "solo"], "13_bus_lorry_solo"),
    (&["double_trailer", "lorry", "solo"], "14_double_trailer_lorry_solo"),
    (&["double_trailer", "solo"], "14_double_trailer_lorry_solo"),
    (&["lorry", "solo"], "lorry_solo"),
];

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PalletDims {
    pub length: f64,
    pub width: f64,
}

impl Default for PalletDims {
    fn default() -> Self {
        Self {
            length: DEFAULT_PALLET_LENGTH_M,
            width: DEFAULT_PALLET_WIDTH_M,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleRule {
    pub max_pallets: u32,
    #[serde(default = "default_m2_per_pallet")]
    pub m2_per_pallet: f64,
    #[serde(default)]
    pub vehicle_sizes: BTreeSet<String>,
    #[serde(default)]
    pub vehicle_bodies: Vec<String>,
    pub pallet_length: Option<f64>,
    pub pallet_width: Option<f64>,
    pub freight_type: Option<String>,
}

fn default_m2_per_pallet() -> f64 {
    DEFAULT_M2_PER_PALLET
}

impl VehicleRule {
    pub fn pallet_dims(&self) -> Option<PalletDims> {
        match (self.pallet_length, self.pallet_width) {
            (Some(length), Some(width)) if length > 0.0 && width > 0.0 => {
                Some(PalletDims { length, width })
            }
            _ => None,
        }
    }
}

pub fn pallets_needed(quantity: f64, m2_per_pallet: f64) -> Option<u32> {
    if !(m2_per_pallet > 0.0) || !(quantity >= 0.0) {
        return None;
    }
    Some((quantity / m2_per_pallet).ceil() as u32)
}

/// First rule, by ascending `max_pallets`, whose capacity holds the load.
/// Rules with equal capacity keep their configured order.
pub fn select_vehicle(rules: &[VehicleRule], quantity: f64) -> Option<(&VehicleRule, u32)> {
    let mut ordered: Vec<&VehicleRule> = rules.iter().collect();
    ordered.sort_by_key(|rule| rule.max_pallets);

    ordered.into_iter().find_map(|rule| {
        let needed = pallets_needed(quantity, rule.m2_per_pallet)?;
        (needed <= rule.max_pallets).then_some((rule, needed))
    })
}

fn size_token(size: &str) -> &str {
    match size.split_once('_') {
        Some((prefix, rest)) if prefix.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => size,
    }
}

/// Collapse a rule's size set to the single id the broker accepts.
pub fn resolve_vehicle_size(sizes: &BTreeSet<String>) -> Result<String, FreightError> {
    let unresolvable = || FreightError::UnresolvableVehicleSize(sizes.iter().cloned().collect());

    match sizes.len() {
        0 => Err(unresolvable()),
        1 => sizes.iter().next().cloned().ok_or_else(unresolvable),
        _ => {
            let tokens: BTreeSet<&str> = sizes.iter().map(|s| size_token(s)).collect();
            COMPOSITE_SIZES
                .iter()
                .find(|(members, _)| members.iter().copied().collect::<BTreeSet<&str>>() == tokens)
                .map(|(_, id)| id.to_string())
                .ok_or_else(unresolvable)
        }
    }
}

/// Whole tons, at least one.
pub fn capacity_tons(weight_kg: f64) -> u32 {
    ((weight_kg / 1000.0).ceil() as u32).max(1)
}

/// Loading meters: floor area of the pallets over the trailer width.
pub fn load_meters(pallets: u32, dims: PalletDims) -> f64 {
    let ldm = round_to(pallets as f64 * dims.length * dims.width / TRAILER_WIDTH_M, 1);
    ldm.max(MIN_LOAD_METERS)
}

/// Pallet footprint per load type.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionTable {
    default: PalletDims,
    by_load_type: HashMap<String, PalletDims>,
}

impl DimensionTable {
    pub fn new(default: PalletDims) -> Self {
        Self {
            default,
            by_load_type: HashMap::new(),
        }
    }

    pub fn with(mut self, load_type: impl Into<String>, dims: PalletDims) -> Self {
        self.by_load_type.insert(load_type.into(), dims);
        self
    }

    pub fn lookup(&self, load_type: &str) -> PalletDims {
        self.by_load_type
            .get(load_type)
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for DimensionTable {
    fn default() -> Self {
        let standard: &[(&str, f64, f64)] = &[
            ("2_europalette", 1.2, 0.8),
            ("3_eur_6_pallet", 0.8, 0.6),
            ("4_eur_2_pallet", 1.2, 1.0),
            ("5_eur_3_pallet", 1.0, 1.2),
            ("6_container", 1.14, 1.14),
            ("7_oversized_pallet", 1.2, 1.2),
            ("8_big_bag", 0.9, 0.9),
            ("9_bag", 0.9, 0.9),
            ("10_cp1_pallet", 1.0, 1.2),
            ("11_cp2_pallet", 0.8, 1.2),
            ("12_cp3_pallet", 1.14, 1.14),
            ("13_cp4_pallet", 1.11, 1.3),
            ("14_cp5_pallet", 0.76, 1.14),
            ("15_cp6_pallet", 1.0, 1.2),
            ("16_cp7_pallet", 1.11, 1.3),
            ("17_cp8_pallet", 1.14, 1.14),
            ("18_cp9_pallet", 1.14, 1.14),
        ];
        standard.iter().fold(
            Self::new(PalletDims::default()),
            |table, &(load_type, length, width)| table.with(load_type, PalletDims { length, width }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(max_pallets: u32, sizes: &[&str]) -> VehicleRule {
        VehicleRule {
            max_pallets,
            m2_per_pallet: 50.0,
            vehicle_sizes: sizes.iter().map(|s| s.to_string()).collect(),
            vehicle_bodies: vec!["curtainsider".into()],
            pallet_length: None,
            pallet_width: None,
            freight_type: None,
        }
    }

    #[test]
    fn selects_first_rule_that_fits() {
        let rules = vec![rule(10, &["3_lorry"]), rule(2, &["1_bus"])];

        // 120 m2 -> 3 pallets, too many for the bus
        let (chosen, pallets) = select_vehicle(&rules, 120.0).unwrap();
        assert_eq!(pallets, 3);
        assert_eq!(chosen.max_pallets, 10);

        let (chosen, pallets) = select_vehicle(&rules, 100.0).unwrap();
        assert_eq!(pallets, 2);
        assert_eq!(chosen.max_pallets, 2);
    }

    #[test]
    fn no_rule_fits() {
        let rules = vec![rule(2, &["1_bus"])];
        assert!(select_vehicle(&rules, 1000.0).is_none());
        assert!(select_vehicle(&[], 10.0).is_none());
    }

    #[test]
    fn resolves_single_and_composite_sizes() {
        let single: BTreeSet<String> = ["3_lorry".to_string()].into();
        assert_eq!(resolve_vehicle_size(&single).unwrap(), "3_lorry");

        let bus_solo: BTreeSet<String> = ["1_bus".to_string(), "5_solo".to_string()].into();
        assert_eq!(resolve_vehicle_size(&bus_solo).unwrap(), "13_bus_lorry_solo");

        let trailer: BTreeSet<String> = ["2_double_trailer", "3_lorry", "5_solo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            resolve_vehicle_size(&trailer).unwrap(),
            "14_double_trailer_lorry_solo"
        );

        let lorry_solo: BTreeSet<String> = ["3_lorry".to_string(), "5_solo".to_string()].into();
        assert_eq!(resolve_vehicle_size(&lorry_solo).unwrap(), "lorry_solo");
    }

    #[test]
    fn unknown_combinations_fail() {
        let mixed: BTreeSet<String> = ["1_bus".to_string(), "2_double_trailer".to_string()].into();
        assert!(matches!(
            resolve_vehicle_size(&mixed),
            Err(FreightError::UnresolvableVehicleSize(_))
        ));
        assert!(resolve_vehicle_size(&BTreeSet::new()).is_err());
    }

    #[test]
    fn capacity_is_at_least_one_ton() {
        assert_eq!(capacity_tons(0.0), 1);
        assert_eq!(capacity_tons(999.0), 1);
        assert_eq!(capacity_tons(1000.0), 1);
        assert_eq!(capacity_tons(1001.0), 2);
        assert_eq!(capacity_tons(2500.0), 3);
    }

    #[test]
    fn load_meters_has_a_floor() {
        let euro = PalletDims::default();
        // 3 * 1.2 * 0.8 / 2.4 = 1.2
        assert_eq!(load_meters(3, euro), 1.2);
        assert_eq!(load_meters(0, euro), MIN_LOAD_METERS);
    }

    #[test]
    fn dimension_lookup_falls_back_to_default() {
        let table = DimensionTable::default();
        assert_eq!(
            table.lookup("8_big_bag"),
            PalletDims { length: 0.9, width: 0.9 }
        );
        assert_eq!(table.lookup("unknown"), PalletDims::default());
    }
}
