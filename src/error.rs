use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dao::{
        models::{InvalidRound, UnknownStatus},
        storage::StorageError,
    },
    state::{
        promotion::PromotionError,
        status::{CheckInError, InvalidTransition},
        timer::TimerError,
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// Requested resource was not found.
    #[error("{0}")]
    NotFound(String),
    /// Operation conflicts with the current state.
    #[error("{0}")]
    Conflict(String),
    /// Operation is not allowed at this time.
    #[error("{0}")]
    Forbidden(String),
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
}

impl ServiceError {
    /// Conflict raised when a compare-and-swap lost against another writer.
    pub fn concurrent_update(what: &str) -> Self {
        ServiceError::Conflict(format!("{what} was modified concurrently; retry"))
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::Conflict(err.to_string())
    }
}

impl From<CheckInError> for ServiceError {
    fn from(err: CheckInError) -> Self {
        ServiceError::Conflict(err.to_string())
    }
}

impl From<TimerError> for ServiceError {
    fn from(err: TimerError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<PromotionError> for ServiceError {
    fn from(err: PromotionError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<InvalidRound> for ServiceError {
    fn from(err: InvalidRound) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<UnknownStatus> for ServiceError {
    fn from(err: UnknownStatus) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Action refused in the current state.
    #[error("{0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("{0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::TeamStatus;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(ServiceError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::Forbidden("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ServiceError::Degraded),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn engine_errors_become_conflicts_or_validation() {
        let invalid = InvalidTransition {
            from: TeamStatus::Eliminated,
            to: TeamStatus::Arrived,
        };
        assert!(matches!(
            ServiceError::from(invalid),
            ServiceError::Conflict(message) if message == "cannot transition from eliminated to arrived"
        ));
        assert!(matches!(
            ServiceError::from(InvalidRound(3)),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            ServiceError::from(CheckInError::AlreadyArrived),
            ServiceError::Conflict(_)
        ));
    }
}
