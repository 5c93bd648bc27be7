// Errors produced while relaying a request to the arena backend.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message sent to callers for every failure that is not theirs or the backend's.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum RelayError {
    /// A required envelope key is absent or falsy.
    #[error("{0} is required")]
    MissingField(String),

    /// The `action` discriminator names no known backend operation.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned unreadable JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid backend URL: {0}")]
    Url(String),
}

impl RelayError {
    /// HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingField(_) | RelayError::InvalidAction(_) => StatusCode::BAD_REQUEST,
            RelayError::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RelayError::InvalidBody(_)
            | RelayError::Transport(_)
            | RelayError::Decode(_)
            | RelayError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `{ "error": ... }` envelope. Internal details
    /// stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::MissingField(_)
            | RelayError::InvalidAction(_)
            | RelayError::Backend { .. } => self.to_string(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    /// Label used for the relay outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::MissingField(_) | RelayError::InvalidAction(_) => "rejected",
            RelayError::Backend { .. } => "backend_error",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_is_bad_request() {
        let err = RelayError::MissingField("topic".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "topic is required");
        assert_eq!(err.outcome(), "rejected");
    }

    #[test]
    fn test_backend_status_is_mirrored() {
        let err = RelayError::Backend {
            status: 404,
            message: "Battle not found".into(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Battle not found");
    }

    #[test]
    fn test_unrepresentable_backend_status_becomes_bad_gateway() {
        let err = RelayError::Backend {
            status: 1000,
            message: "odd".into(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err = RelayError::InvalidBody(parse_err);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
        assert_eq!(err.outcome(), "internal_error");
    }
}
