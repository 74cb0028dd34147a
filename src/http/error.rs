use crate::core::classifier::{ClassifiedError, ErrorKind};
use crate::utils::error::GatewayError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors leaving an HTTP handler. Bodies are plain text, like the upstreams
/// produce them.
#[derive(Debug)]
pub enum ApiError {
    Upstream(ClassifiedError),
    NotFound,
    Internal(String),
}

impl From<ClassifiedError> for ApiError {
    fn from(error: ClassifiedError) -> Self {
        Self::Upstream(error)
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Upstream(error) => Self::Upstream(error),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 4xx and 5xx statuses pass through; anything that did not produce a usable
/// upstream status becomes 502.
pub fn status_for(error: &ClassifiedError) -> StatusCode {
    let upstream_status = error.status.and_then(|code| StatusCode::from_u16(code).ok());
    match error.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ClientError => upstream_status
            .filter(StatusCode::is_client_error)
            .unwrap_or(StatusCode::BAD_REQUEST),
        ErrorKind::ServerError => upstream_status
            .filter(StatusCode::is_server_error)
            .unwrap_or(StatusCode::BAD_GATEWAY),
        ErrorKind::TransportError => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Upstream(error) => {
                let status = status_for(&error);
                tracing::error!(
                    "Request failed with {:?} ({}): {}",
                    error.kind(),
                    status.as_u16(),
                    error.message
                );
                (status, error.message).into_response()
            }
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}
