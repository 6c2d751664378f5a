//! Server error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use tollgate_core::CoreError;
use tollgate_feed::FeedError;
use tollgate_provision::ProvisionError;
use tollgate_registry::RegistryError;
use tollgate_sync::SyncError;

/// Process-level errors (startup, configuration).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Request-level errors rendered as structured JSON.
///
/// Every variant maps to one `{ "error": <kind>, "message": <human> }`
/// body; `Provisioning` additionally carries the job reference so callers
/// can poll it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    /// Collaborator or upstream unreachable.
    #[error("{0}")]
    Unavailable(String),

    /// Upstream accepted the connection but never answered in time.
    #[error("{0}")]
    UpstreamTimeout(String),

    #[error("{message}")]
    Provisioning {
        message: String,
        job_id: Option<String>,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unavailable(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Provisioning { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::InvalidInput(_) => "invalid_input",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::Unavailable(_) => "unavailable",
            Self::UpstreamTimeout(_) => "unavailable",
            Self::Provisioning { .. } => "provisioning",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Provisioning {
            job_id: Some(job_id),
            ..
        } = &self
        {
            body["job_id"] = json!(job_id);
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(path) => Self::NotFound(format!("Route not found: {path}")),
            RegistryError::AlreadyExists(path) => {
                Self::AlreadyExists(format!("Route already exists: {path}"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<ProvisionError> for ApiError {
    fn from(e: ProvisionError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Registry(inner) => inner.into(),
            SyncError::Feed(inner) => inner.into(),
            SyncError::Provision(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::AlreadyExists("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::UpstreamTimeout("x".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::Provisioning {
                message: "x".into(),
                job_id: None
            }
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_registry_not_found_maps_to_404() {
        let err: ApiError = RegistryError::NotFound("/weather".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), "not_found");
    }
}
