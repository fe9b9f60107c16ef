pub mod broker;
pub mod http_client;

pub use broker::{BrokerClient, PricePrediction};
pub use http_client::HttpClient;
