//! Error types and their HTTP mapping for the gateway and resolver services

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures a request can end in. Each variant maps to exactly one status
/// code and one fixed, human-readable body.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The postal code is not exactly eight ASCII digits
    #[error("invalid zipcode")]
    InvalidFormat,

    /// The postal code does not resolve to a locality
    #[error("can not find zipcode")]
    NotFound,

    /// A downstream HTTP call failed, timed out or returned an unusable body
    #[error("upstream failure: {reason}")]
    UpstreamFailure { reason: String },

    /// A credential required for a downstream call is not configured
    #[error("weather api key missing")]
    MisconfiguredDependency,

    /// The endpoint was called with an unsupported HTTP verb
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl ServiceError {
    /// Create a new upstream failure
    pub fn upstream<S: Into<String>>(reason: S) -> Self {
        Self::UpstreamFailure {
            reason: reason.into(),
        }
    }

    /// Status code reported to the caller
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidFormat => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::MisconfiguredDependency => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Body reported to the caller. Upstream reasons stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::InvalidFormat => "invalid zipcode",
            ServiceError::NotFound => "can not find zipcode",
            ServiceError::UpstreamFailure { .. } => "bad gateway",
            ServiceError::MisconfiguredDependency => "weather api key missing",
            ServiceError::MethodNotAllowed => "method not allowed",
        }
    }
}

impl From<tokio::time::error::Elapsed> for ServiceError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::upstream("request deadline exceeded")
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if let ServiceError::UpstreamFailure { reason } = &self {
            tracing::warn!(%reason, "Downstream call failed");
        }
        (self.status(), self.user_message()).into_response()
    }
}
