use crate::core::broadcast::{BroadcastHub, Subscription};
use crate::domain::ports::{Entity, Repository};
use crate::utils::error::Result;
use std::sync::Arc;

/// CRUD over one entity type. Only creations are announced on the
/// [`BroadcastHub`].
pub struct CatalogService<E: Entity> {
    repository: Arc<dyn Repository<E>>,
    hub: BroadcastHub<E>,
}

impl<E: Entity> Clone for CatalogService<E> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            hub: self.hub.clone(),
        }
    }
}

impl<E: Entity> CatalogService<E> {
    pub fn new(repository: Arc<dyn Repository<E>>, hub: BroadcastHub<E>) -> Self {
        Self { repository, hub }
    }

    /// Persists `entity`, then publishes the stored version.
    pub async fn create(&self, entity: E) -> Result<E> {
        let stored = self.repository.create(entity).await?;
        let sequence = self.hub.publish(stored.clone());
        tracing::info!(
            "{}: created {} (event #{})",
            self.hub.name(),
            stored.id().unwrap_or("<no id>"),
            sequence
        );
        Ok(stored)
    }

    pub async fn find(&self, id: &str) -> Result<Option<E>> {
        self.repository.find(id).await
    }

    pub async fn list(&self, filter: &E::Filter) -> Result<Vec<E>> {
        self.repository.list(filter).await
    }

    pub async fn update(&self, id: &str, entity: E) -> Result<Option<E>> {
        let updated = self.repository.update(id, entity).await?;
        if updated.is_some() {
            tracing::info!("{}: updated {}", self.hub.name(), id);
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.repository.delete(id).await?;
        if deleted {
            tracing::info!("{}: deleted {}", self.hub.name(), id);
        }
        Ok(deleted)
    }

    pub fn subscribe(&self) -> Subscription<E> {
        self.hub.attach()
    }

    pub fn hub(&self) -> &BroadcastHub<E> {
        &self.hub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRepository;
    use crate::domain::model::{Review, ReviewFilter};
    use futures::{FutureExt, StreamExt};

    fn review(movie_info_id: &str, comment: &str) -> Review {
        Review {
            review_id: None,
            movie_info_id: movie_info_id.to_string(),
            comment: Some(comment.to_string()),
            rating: Some(8.0),
        }
    }

    fn service() -> CatalogService<Review> {
        CatalogService::new(
            Arc::new(InMemoryRepository::<Review>::new()),
            BroadcastHub::new("reviews"),
        )
    }

    #[tokio::test]
    async fn test_create_publishes_stored_entity() {
        let service = service();
        let mut subscription = service.subscribe();

        let stored = service.create(review("1", "Awesome Movie")).await.unwrap();
        assert!(stored.review_id.is_some());

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.payload, stored);
    }

    #[tokio::test]
    async fn test_late_subscriber_replays_latest_creation() {
        let service = service();
        service.create(review("1", "first")).await.unwrap();
        let latest = service.create(review("1", "second")).await.unwrap();

        let mut subscription = service.subscribe();
        assert_eq!(subscription.recv().await.unwrap().payload, latest);
    }

    #[tokio::test]
    async fn test_find_and_list_delegate_to_repository() {
        let service = service();
        let stored = service.create(review("1", "one")).await.unwrap();
        service.create(review("2", "two")).await.unwrap();

        let id = stored.review_id.clone().unwrap();
        assert_eq!(service.find(&id).await.unwrap(), Some(stored));
        assert_eq!(service.find("missing").await.unwrap(), None);

        let filter = ReviewFilter {
            movie_info_id: Some("2".to_string()),
        };
        let reviews = service.list(&filter).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].comment.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_not_broadcast() {
        let service = service();
        let stored = service.create(review("1", "Awesome Movie")).await.unwrap();
        let id = stored.review_id.clone().unwrap();

        let mut subscription = service.subscribe();
        assert_eq!(subscription.recv().await.unwrap().payload, stored);

        let updated = service
            .update(&id, review("1", "Excellent Movie"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.comment.as_deref(), Some("Excellent Movie"));
        assert_eq!(service.find(&id).await.unwrap(), Some(updated));

        assert!(service.delete(&id).await.unwrap());
        assert_eq!(service.find(&id).await.unwrap(), None);
        assert_eq!(service.update(&id, review("1", "gone")).await.unwrap(), None);

        assert_eq!(service.hub().latest().map(|event| event.payload), Some(stored));
        assert!(subscription.next().now_or_never().is_none());
    }
}
