pub mod models;
pub mod catalog;
pub mod topology;
pub mod rules;
pub mod loadbalance;
pub mod connectivity;
pub mod analyzer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
