use crate::core::orchestrator::AggregationOrchestrator;
use crate::domain::model::Movie;
use crate::http::error::ApiResult;
use crate::http::ndjson::ndjson_response;
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct GatewayState {
    orchestrator: Arc<AggregationOrchestrator>,
    shutdown: CancellationToken,
}

impl GatewayState {
    /// Relayed feeds end once `shutdown` is cancelled.
    pub fn new(orchestrator: AggregationOrchestrator, shutdown: CancellationToken) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            shutdown,
        }
    }
}

pub fn routes(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/movies/streams", get(stream_movie_info))
        .route("/v1/movies/{id}", get(get_movie))
        .with_state(state)
}

async fn get_movie(
    State(state): State<GatewayState>,
    Path(movie_id): Path<String>,
) -> ApiResult<Json<Movie>> {
    let movie = state.orchestrator.get_movie(&movie_id).await?;
    Ok(Json(movie))
}

async fn stream_movie_info(State(state): State<GatewayState>) -> ApiResult<Response> {
    let movies = state.orchestrator.movie_info_stream().await?;
    Ok(ndjson_response(movies.take_until(state.shutdown.cancelled_owned())))
}
