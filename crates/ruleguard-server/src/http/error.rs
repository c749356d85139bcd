//! Maps the shared domain error into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ruleguard_domain::error::Error;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Newtype so `ruleguard_domain::Error` (defined in another crate) can
/// implement `axum::response::IntoResponse` here.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::AlreadyExists { .. } => StatusCode::CONFLICT,
            Error::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Error::FailedPrecondition { .. } => StatusCode::CONFLICT,
            Error::Config { .. } | Error::Internal { .. } | Error::Store(_) | Error::Io(_) | Error::Expression(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
