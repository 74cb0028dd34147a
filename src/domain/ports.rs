use crate::core::retry::RetryPolicy;
use crate::domain::model::{MovieInfo, MovieInfoFilter, Review, ReviewFilter};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A record owned by a persistence collaborator.
pub trait Entity: Clone + Send + Sync + 'static {
    type Filter: Send + Sync;

    fn id(&self) -> Option<&str>;
    fn assign_id(&mut self, id: String);
    fn matches(&self, filter: &Self::Filter) -> bool;
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn create(&self, entity: E) -> Result<E>;
    async fn find(&self, id: &str) -> Result<Option<E>>;
    async fn list(&self, filter: &E::Filter) -> Result<Vec<E>>;
    /// Replaces the entity stored under `id`. `None` when nothing is stored
    /// there.
    async fn update(&self, id: &str, entity: E) -> Result<Option<E>>;
    /// Returns whether something was removed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub trait ConfigProvider: Send + Sync {
    fn movies_info_url(&self) -> &str;
    fn reviews_url(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
    fn retry_policy(&self) -> RetryPolicy;
}

impl Entity for MovieInfo {
    type Filter = MovieInfoFilter;

    fn id(&self) -> Option<&str> {
        self.movie_info_id.as_deref()
    }

    fn assign_id(&mut self, id: String) {
        self.movie_info_id = Some(id);
    }

    fn matches(&self, filter: &MovieInfoFilter) -> bool {
        let year_matches = filter.year.map_or(true, |year| self.year == Some(year));
        let name_matches = filter.name.as_deref().map_or(true, |name| self.name == name);
        year_matches && name_matches
    }
}

impl Entity for Review {
    type Filter = ReviewFilter;

    fn id(&self) -> Option<&str> {
        self.review_id.as_deref()
    }

    fn assign_id(&mut self, id: String) {
        self.review_id = Some(id);
    }

    fn matches(&self, filter: &ReviewFilter) -> bool {
        filter
            .movie_info_id
            .as_deref()
            .map_or(true, |movie_info_id| self.movie_info_id == movie_info_id)
    }
}
