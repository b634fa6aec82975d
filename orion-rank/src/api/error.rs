//! HTTP error responses
//!
//! Every failure is answered with a JSON body `{"error": "<message>"}`.

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// No usable `X-User-Id` header
    MissingUser,
    /// Malformed request parameter
    BadRequest(String),
    Rank(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Rank(err)
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidTier(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::EntryNotFound(_) => StatusCode::NOT_FOUND,
        Error::Common(orion_common::Error::FilmNotFound(_)) => StatusCode::NOT_FOUND,
        Error::Common(orion_common::Error::UnknownTier(_)) => StatusCode::BAD_REQUEST,
        Error::Catalog(_) | Error::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Common(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingUser => (
                StatusCode::UNAUTHORIZED,
                "Missing X-User-Id header".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Rank(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!(error = %err, "Request failed");
                }
                (status, err.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
