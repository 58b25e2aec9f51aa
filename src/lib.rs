pub mod antibot;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod harvester;
pub mod scheduler;
pub mod similarity;
pub mod strategy;
pub mod warc_sink;

pub use error::HarvestError;
pub use harvester::Harvester;
pub use strategy::StrategyKind;
