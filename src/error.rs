use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::models::ErrorBody;

pub const PROMPT_REQUIRED: &str = "Prompt is required";
pub const API_KEY_NOT_CONFIGURED: &str = "API key not configured";
pub const NO_IMAGE_DATA: &str = "No image data returned from API";
pub const GENERATION_FAILED: &str = "Failed to generate image";

/// Normalized failure taxonomy shared by the endpoint and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing prompt; no provider call was made.
    Validation,
    /// The operator did not configure a credential.
    Configuration,
    /// The provider answered but rejected the request or returned nothing usable.
    Provider,
    /// The provider (or the endpoint, seen from the client) could not be reached.
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Provider => "provider error",
            ErrorKind::Transport => "transport error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("provider rejected the request with status {status}")]
    Rejected { status: u16, detail: Value },
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    #[error("provider returned no images")]
    EmptyResult,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::MissingCredential => ErrorKind::Configuration,
            ProviderError::Rejected { .. } | ProviderError::EmptyResult => ErrorKind::Provider,
            ProviderError::Unreachable(_) => ErrorKind::Transport,
        }
    }

    /// Diagnostic payload safe to hand back to callers.
    pub fn details(&self) -> Option<Value> {
        match self {
            ProviderError::Rejected { detail, .. } => Some(detail.clone()),
            ProviderError::Unreachable(message) => Some(Value::String(message.clone())),
            ProviderError::MissingCredential | ProviderError::EmptyResult => None,
        }
    }

    /// The `error` message the endpoint reports for this failure.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProviderError::MissingCredential => API_KEY_NOT_CONFIGURED,
            ProviderError::EmptyResult => NO_IMAGE_DATA,
            ProviderError::Rejected { .. } | ProviderError::Unreachable(_) => GENERATION_FAILED,
        }
    }
}

/// Errors surfaced by the generation endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Provider(err) => err.kind(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation { message, details } => ErrorBody {
                error: message.clone(),
                details: details.clone(),
                kind: Some(ErrorKind::Validation),
            },
            ApiError::Provider(err) => ErrorBody {
                error: err.public_message().to_string(),
                details: err.details(),
                kind: Some(err.kind()),
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

/// A completed request that did not produce an image, as seen by the client.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct GenerationFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<Value>,
}

impl GenerationFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_errors_map_to_kinds() {
        assert_eq!(
            ProviderError::MissingCredential.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(ProviderError::EmptyResult.kind(), ErrorKind::Provider);
        assert_eq!(
            ProviderError::Unreachable("timed out".into()).kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn missing_credential_body_has_no_details() {
        let body = ApiError::from(ProviderError::MissingCredential).body();
        assert_eq!(body.error, "API key not configured");
        assert!(body.details.is_none());
        assert_eq!(body.kind, Some(ErrorKind::Configuration));
    }

    #[test]
    fn rejected_body_carries_provider_payload() {
        let payload = json!({"error": {"message": "content policy"}});
        let err = ApiError::from(ProviderError::Rejected {
            status: 400,
            detail: payload.clone(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body.error, "Failed to generate image");
        assert_eq!(body.details, Some(payload));
    }

    #[test]
    fn validation_is_a_client_error() {
        let err = ApiError::validation(PROMPT_REQUIRED);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
