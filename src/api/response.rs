//! Response types for the payroll engine API.
//!
//! This module defines the error response structures and error handling
//! for the HTTP API. Every endpoint maps [`EngineError`] the same way.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let (status, details) = match &error {
            EngineError::ConfigNotFound { .. } => (
                StatusCode::NOT_FOUND,
                "No organization with this slug exists in the configuration store",
            ),
            EngineError::ConfigFetchFailed { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "The configuration store could not be read",
            ),
            EngineError::InvalidRule { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The organization's configuration is malformed",
            ),
            EngineError::MissingRequiredRule { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The organization does not configure a rule this calculation needs",
            ),
            EngineError::StaleParameterDetected { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "A parameter is outside its valid range",
            ),
            EngineError::InvalidParameters { .. } => (
                StatusCode::BAD_REQUEST,
                "The calculation parameters contain invalid information",
            ),
            EngineError::CalculationError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Calculation failed")
            }
        };

        ApiErrorResponse {
            status,
            error: ApiError::with_details(error.code(), error.to_string(), details),
        }
    }
}

/// Body returned by the per-organization cache invalidation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationResponse {
    /// The organization whose cached configuration was targeted.
    pub org_slug: String,
    /// Whether a cached configuration was actually dropped.
    pub invalidated: bool,
}
