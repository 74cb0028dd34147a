pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod http;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{GatewayConfig, Role};
pub use crate::core::{
    broadcast::BroadcastHub, catalog::CatalogService, classifier::ClassifiedError,
    orchestrator::AggregationOrchestrator, retry::RetryPolicy, upstream::UpstreamClient,
};
pub use utils::error::{GatewayError, Result};
