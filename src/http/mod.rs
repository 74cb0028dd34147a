pub mod catalog;
pub mod error;
pub mod movies;
pub mod ndjson;

use crate::core::catalog::CatalogService;
use crate::core::orchestrator::AggregationOrchestrator;
use crate::domain::model::{MovieInfo, Review};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use movies::GatewayState;

pub const MOVIES_INFO_PATH: &str = "/v1/moviesinfo";
pub const REVIEWS_PATH: &str = "/v1/reviews";

pub fn gateway_router(
    orchestrator: AggregationOrchestrator,
    shutdown: CancellationToken,
) -> Router {
    movies::routes(GatewayState::new(orchestrator, shutdown)).layer(TraceLayer::new_for_http())
}

pub fn movies_info_router(service: CatalogService<MovieInfo>) -> Router {
    catalog::routes(MOVIES_INFO_PATH, service).layer(TraceLayer::new_for_http())
}

pub fn reviews_router(service: CatalogService<Review>) -> Router {
    catalog::routes(REVIEWS_PATH, service).layer(TraceLayer::new_for_http())
}
