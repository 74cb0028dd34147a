use crate::domain::ports::{Entity, Repository};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store, kept in insertion order. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryRepository<E> {
    entities: RwLock<Vec<E>>,
}

impl<E> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn create(&self, mut entity: E) -> Result<E> {
        if entity.id().is_none() {
            entity.assign_id(Uuid::new_v4().to_string());
        }

        let mut entities = self.entities.write().await;
        // Same id means replace, as a document store save would.
        entities.retain(|existing| existing.id() != entity.id());
        entities.push(entity.clone());
        Ok(entity)
    }

    async fn find(&self, id: &str) -> Result<Option<E>> {
        let entities = self.entities.read().await;
        Ok(entities.iter().find(|e| e.id() == Some(id)).cloned())
    }

    async fn list(&self, filter: &E::Filter) -> Result<Vec<E>> {
        let entities = self.entities.read().await;
        Ok(entities
            .iter()
            .filter(|e| e.matches(filter))
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, mut entity: E) -> Result<Option<E>> {
        let mut entities = self.entities.write().await;
        let Some(slot) = entities.iter_mut().find(|e| e.id() == Some(id)) else {
            return Ok(None);
        };

        // The path id wins over whatever the body carries.
        entity.assign_id(id.to_string());
        *slot = entity.clone();
        Ok(Some(entity))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut entities = self.entities.write().await;
        let before = entities.len();
        entities.retain(|e| e.id() != Some(id));
        Ok(entities.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MovieInfo, MovieInfoFilter};

    fn movie(id: Option<&str>, name: &str, year: i32) -> MovieInfo {
        MovieInfo {
            movie_info_id: id.map(str::to_string),
            name: name.to_string(),
            year: Some(year),
            cast: vec!["Christian Bale".to_string()],
            release_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_missing_id() {
        let repository = InMemoryRepository::new();
        let stored = repository
            .create(movie(None, "Batman Begins", 2005))
            .await
            .unwrap();

        let id = stored.movie_info_id.clone().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(repository.find(&id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_create_with_existing_id_replaces() {
        let repository = InMemoryRepository::new();
        repository
            .create(movie(Some("abc"), "The Dark Knight", 2008))
            .await
            .unwrap();
        repository
            .create(movie(Some("abc"), "The Dark Knight Rises", 2012))
            .await
            .unwrap();

        let all = repository.list(&MovieInfoFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "The Dark Knight Rises");
    }

    #[tokio::test]
    async fn test_list_applies_filter() {
        let repository = InMemoryRepository::new();
        for entity in [
            movie(Some("1"), "Batman Begins", 2005),
            movie(Some("2"), "The Dark Knight", 2008),
        ] {
            repository.create(entity).await.unwrap();
        }

        let filter = MovieInfoFilter {
            year: Some(2008),
            name: None,
        };
        let found = repository.list(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].movie_info_id.as_deref(), Some("2"));

        let filter = MovieInfoFilter {
            year: None,
            name: Some("Batman Begins".to_string()),
        };
        assert_eq!(repository.list(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_path_id_and_position() {
        let repository = InMemoryRepository::new();
        repository
            .create(movie(Some("1"), "Batman Begins", 2005))
            .await
            .unwrap();
        repository
            .create(movie(Some("2"), "The Dark Knight", 2008))
            .await
            .unwrap();

        let updated = repository
            .update("1", movie(Some("other"), "Batman Begins (Remastered)", 2005))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.movie_info_id.as_deref(), Some("1"));

        let all = repository.list(&MovieInfoFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Batman Begins (Remastered)");
        assert_eq!(repository.find("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_unknown_id_stores_nothing() {
        let repository = InMemoryRepository::new();
        let updated = repository
            .update("missing", movie(None, "Batman Begins", 2005))
            .await
            .unwrap();

        assert_eq!(updated, None);
        assert!(repository
            .list(&MovieInfoFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let repository = InMemoryRepository::new();
        repository
            .create(movie(Some("abc"), "Batman Begins", 2005))
            .await
            .unwrap();

        assert!(repository.delete("abc").await.unwrap());
        assert!(!repository.delete("abc").await.unwrap());
        assert_eq!(repository.find("abc").await.unwrap(), None);
    }
}
