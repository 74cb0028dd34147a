use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
    BoxError,
};
use futures::{Stream, StreamExt};
use serde::Serialize;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Streams `items` as one JSON document per line. The first error ends the
/// response body.
pub fn ndjson_response<S, T, E>(items: S) -> Response
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Serialize + 'static,
    E: Into<BoxError> + 'static,
{
    let lines = items.map(|item| {
        let item = item.map_err(Into::<BoxError>::into)?;
        let mut line = serde_json::to_string(&item)?;
        line.push('\n');
        Ok::<_, BoxError>(line)
    });

    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines),
    )
        .into_response()
}
