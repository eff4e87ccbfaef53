//! API error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::Error;

/// Pipeline stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcription,
    Generation,
}

/// Errors returned by the HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or empty request
    BadRequest(String),
    /// A model capability failed
    StageFailed { stage: Stage, message: String },
}

impl ApiError {
    /// Map a model error into a response for `stage`
    #[must_use]
    pub fn from_stage(stage: Stage, error: Error) -> Self {
        match error {
            Error::Validation(msg) => Self::BadRequest(msg),
            other => Self::StageFailed {
                stage,
                message: other.to_string(),
            },
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error, stage: None },
            ),
            Self::StageFailed { stage, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: message,
                    stage: Some(stage),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::from_stage(Stage::Generation, Error::Validation("empty".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from_stage(
            Stage::Transcription,
            Error::Transcription("model offline".to_string()),
        );
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
