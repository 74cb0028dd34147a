use crate::core::classifier::ClassifiedError;
use crate::core::upstream::UpstreamClient;
use crate::domain::model::{Movie, MovieInfo, Review};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use futures::stream::BoxStream;

pub const MOVIES_INFO_UPSTREAM: &str = "MoviesInfoService";
pub const REVIEWS_UPSTREAM: &str = "MoviesReviewService";
pub const MOVIE_NOT_FOUND_MESSAGE: &str = "No such movie exist for the ID: {id}";
pub const REVIEWS_QUERY_PARAM: &str = "movieInfoId";
pub const MOVIES_INFO_STREAM_PATH: &str = "streams";

/// Combines the movie-info and reviews upstreams into one [`Movie`].
///
/// The movie lookup runs first; reviews are only requested once it succeeded,
/// so a missing or failing movie never reaches the reviews service.
#[derive(Debug, Clone)]
pub struct AggregationOrchestrator {
    movies_info: UpstreamClient,
    reviews: UpstreamClient,
}

impl AggregationOrchestrator {
    pub fn new(movies_info: UpstreamClient, reviews: UpstreamClient) -> Self {
        Self {
            movies_info,
            reviews,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let retry = config.retry_policy();
        let timeout = config.request_timeout();

        let movies_info = UpstreamClient::with_timeout(
            MOVIES_INFO_UPSTREAM,
            config.movies_info_url(),
            retry,
            timeout,
        )?
        .with_not_found_message(MOVIE_NOT_FOUND_MESSAGE);
        let reviews =
            UpstreamClient::with_timeout(REVIEWS_UPSTREAM, config.reviews_url(), retry, timeout)?;

        Ok(Self::new(movies_info, reviews))
    }

    pub async fn get_movie(&self, movie_id: &str) -> std::result::Result<Movie, ClassifiedError> {
        tracing::debug!("Aggregating movie {}", movie_id);

        let movie_info: MovieInfo = self.movies_info.fetch_one(movie_id).await?;
        let reviews: Vec<Review> = self
            .reviews
            .fetch_many(REVIEWS_QUERY_PARAM, movie_id)
            .await?;

        tracing::debug!(
            "Movie {} aggregated with {} reviews",
            movie_id,
            reviews.len()
        );
        Ok(Movie::new(movie_info, reviews))
    }

    /// Live feed of newly created movie infos from the movie-info service.
    pub async fn movie_info_stream(
        &self,
    ) -> std::result::Result<
        BoxStream<'static, std::result::Result<MovieInfo, ClassifiedError>>,
        ClassifiedError,
    > {
        self.movies_info.stream(MOVIES_INFO_STREAM_PATH).await
    }
}
