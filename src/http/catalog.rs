use crate::core::catalog::CatalogService;
use crate::domain::ports::Entity;
use crate::http::error::{ApiError, ApiResult};
use crate::http::ndjson::ndjson_response;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use serde::{de::DeserializeOwned, Serialize};
use std::convert::Infallible;

/// `POST|GET {base}`, `GET|PUT|DELETE {base}/{id}` and the live
/// `GET {base}/streams` feed.
pub fn routes<E>(base: &str, service: CatalogService<E>) -> Router
where
    E: Entity + Serialize + DeserializeOwned,
    E::Filter: DeserializeOwned,
{
    Router::new()
        .route(base, get(list_entities::<E>).post(create_entity::<E>))
        .route(&format!("{}/streams", base), get(stream_entities::<E>))
        .route(
            &format!("{}/{{id}}", base),
            get(get_entity::<E>)
                .put(update_entity::<E>)
                .delete(delete_entity::<E>),
        )
        .with_state(service)
}

async fn create_entity<E>(
    State(service): State<CatalogService<E>>,
    Json(entity): Json<E>,
) -> ApiResult<(StatusCode, Json<E>)>
where
    E: Entity + Serialize + DeserializeOwned,
{
    let stored = service.create(entity).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_entities<E>(
    State(service): State<CatalogService<E>>,
    Query(filter): Query<E::Filter>,
) -> ApiResult<Json<Vec<E>>>
where
    E: Entity + Serialize,
    E::Filter: DeserializeOwned,
{
    Ok(Json(service.list(&filter).await?))
}

async fn get_entity<E>(
    State(service): State<CatalogService<E>>,
    Path(id): Path<String>,
) -> ApiResult<Json<E>>
where
    E: Entity + Serialize,
{
    service.find(&id).await?.map(Json).ok_or(ApiError::NotFound)
}

async fn update_entity<E>(
    State(service): State<CatalogService<E>>,
    Path(id): Path<String>,
    Json(entity): Json<E>,
) -> ApiResult<Json<E>>
where
    E: Entity + Serialize + DeserializeOwned,
{
    service
        .update(&id, entity)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn delete_entity<E>(
    State(service): State<CatalogService<E>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode>
where
    E: Entity,
{
    service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stream_entities<E>(State(service): State<CatalogService<E>>) -> Response
where
    E: Entity + Serialize,
{
    let events = service
        .subscribe()
        .map(|event| Ok::<_, Infallible>(event.payload));
    ndjson_response(events)
}
