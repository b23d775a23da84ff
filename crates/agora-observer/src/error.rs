//! Error types for the control surface.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use agora_core::genesis::GenesisError;
use agora_core::{SchedulerError, StoreError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An invalid query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The scheduler refused or failed the operation.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A fresh world could not be generated.
    #[error(transparent)]
    Genesis(#[from] GenesisError),

    /// The world store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ObserverError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidQuery(_) | Self::InvalidUuid(_) => StatusCode::BAD_REQUEST,
            Self::Scheduler(SchedulerError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            Self::Scheduler(SchedulerError::Halted(_) | SchedulerError::Tick(_))
            | Self::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Scheduler(SchedulerError::Store(_)) | Self::Genesis(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use agora_core::SchedulerState;

    use super::*;

    #[test]
    fn refused_transitions_conflict() {
        let err = ObserverError::from(SchedulerError::InvalidTransition {
            from: SchedulerState::Running,
            operation: "reset",
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "cannot reset while running");
    }

    #[test]
    fn infrastructure_failures_are_server_errors() {
        let halted = ObserverError::from(SchedulerError::Halted("db down".to_owned()));
        assert_eq!(halted.status(), StatusCode::SERVICE_UNAVAILABLE);

        let backend = ObserverError::from(StoreError::Backend("constraint".to_owned()));
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let missing = ObserverError::NotFound("agent".to_owned());
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
