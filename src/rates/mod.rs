pub mod aggregator;
pub mod carrier;
pub mod filter;
pub mod promotion;
pub mod tax;

pub use aggregator::RateAggregator;
pub use carrier::Carrier;
pub use filter::{filter_exclusive, filter_exclusive_grouped, PricedRate};
pub use promotion::{PromotionRules, ThresholdPromotions};
pub use tax::{apply_tax_rounding, breakdown_from_table};
