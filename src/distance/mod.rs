pub mod providers;
pub mod resolver;

pub use providers::DistanceProvider;
pub use resolver::{create_provider, DistanceResolver};
