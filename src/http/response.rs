//! Response envelope and error-to-status mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::Error;

/// `{"success": .., "message": .., "data": ..}` envelope used by every
/// endpoint except the root probe.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Success envelope with no data.
pub type Ack = ApiResponse<()>;

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl Error {
    /// HTTP status for this error.
    ///
    /// "Try again later" outcomes (empty queue, still queued, still
    /// processing) and duplicates share 422 Unprocessable Entity.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } | Error::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Error::Duplicate { .. }
            | Error::EmptyQueue
            | Error::StillProcessing { .. }
            | Error::StillQueued { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound { .. } | Error::NotInProgress { .. } => StatusCode::NOT_FOUND,
            Error::InvalidTransition { .. } | Error::Config(_) | Error::Io(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ApiResponse::<()> {
            success: false,
            message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_expected_statuses() {
        assert_eq!(
            Error::Validation { field: "url" }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Duplicate { id: "1".into() }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(Error::EmptyQueue.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            Error::StillQueued { id: "1".into() }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::NotInProgress { id: "1".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = Error::Other("index out of sync".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
