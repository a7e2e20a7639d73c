use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::FetchError;
use crate::state::SelectionError;

/// The JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorType {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    context: Option<String>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, error, context): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            error: error.to_string(),
            context,
        }
    }
}

impl From<FetchError> for ApiErrorType {
    fn from(err: FetchError) -> Self {
        let (status, message) = match &err {
            FetchError::InvalidTerm { .. } => (StatusCode::BAD_REQUEST, "Invalid term"),
            FetchError::UnexpectedStatus { status: 404, .. } => {
                (StatusCode::NOT_FOUND, "Not found upstream")
            }
            FetchError::Network { message } if message.contains("timed out") => {
                (StatusCode::GATEWAY_TIMEOUT, "Course data API timed out")
            }
            FetchError::UrlError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Bad course data API URL")
            }
            _ => (StatusCode::BAD_GATEWAY, "Failed to fetch course data"),
        };
        Self::from((status, message, Some(err.to_string())))
    }
}

impl From<SelectionError> for ApiErrorType {
    fn from(err: SelectionError) -> Self {
        let status = match &err {
            SelectionError::UnknownCourse(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::from((status, "Invalid course selection", Some(err.to_string())))
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
