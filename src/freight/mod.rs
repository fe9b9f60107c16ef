pub mod currency;
pub mod request;
pub mod resolver;
pub mod throttle;
pub mod vehicle;

pub use currency::{convert_from_eur, CurrencyRates, StaticRates};
pub use resolver::{FreightContext, FreightQuoteResolver, LoadPlan, UnitWeightSource};
pub use throttle::BrokerThrottle;
