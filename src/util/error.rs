use axum::{http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Internal,
    Conflict,
    BadRequest,
    PaymentFailed,
    /// Gateway still processing; the client should retry shortly.
    PaymentPending,
    /// Payment went through but local state could not be written. Must
    /// never be retried as a payment; escalate to support.
    PaymentInconsistent,
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Conflict => "Conflict",
            HandlerErrorKind::BadRequest => "BadRequest",
            HandlerErrorKind::PaymentFailed => "PaymentFailed",
            HandlerErrorKind::PaymentPending => "PaymentPending",
            HandlerErrorKind::PaymentInconsistent => "PaymentInconsistent",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub error: HandlerErrorKind,
    pub message: String,
    /// Machine-readable code for classes a client must branch on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// External payment reference, included for manual reconciliation when
    /// the consistency class fires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl HandlerError {
    pub fn new(error: HandlerErrorKind, message: impl Into<String>) -> Self {
        HandlerError { error, message: message.into(), code: None, reference: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::BadRequest, message)
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self.error {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation | HandlerErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Conflict => StatusCode::CONFLICT,
            HandlerErrorKind::PaymentFailed => StatusCode::BAD_REQUEST,
            HandlerErrorKind::PaymentPending => StatusCode::ACCEPTED,
            HandlerErrorKind::PaymentInconsistent => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(self);
        (status, body).into_response()
    }
}

/// Service-layer error taxonomy. Every rejected transition names the failed
/// precondition so the client can decide whether to retry, refresh or
/// escalate.
#[derive(Debug, Clone)]
pub enum ServiceError {
    NotFound(String),
    InvalidInput(String),
    /// Wrong lifecycle state or a competing write won.
    Conflict(String),
    /// Gateway rejected the payment.
    PaymentFailed(String),
    /// Gateway still processing (or timed out); client-driven retry.
    PaymentPending(String),
    /// Gateway confirmed the charge but local persistence failed. Carries
    /// the external reference for manual reconciliation.
    ConsistencyFailure { message: String, reference: String },
    InternalError(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ServiceError::InvalidInput(msg) => write!(f, "Invalid Input: {}", msg),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::PaymentFailed(msg) => write!(f, "Payment Failed: {}", msg),
            ServiceError::PaymentPending(msg) => write!(f, "Payment Pending: {}", msg),
            ServiceError::ConsistencyFailure { message, reference } => {
                write!(f, "Consistency Failure: {} (reference: {})", message, reference)
            }
            ServiceError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<crate::repository::repository_error::RepositoryError> for ServiceError {
    fn from(err: crate::repository::repository_error::RepositoryError) -> Self {
        use crate::repository::repository_error::RepositoryError;
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::ValidationError(msg) => ServiceError::InvalidInput(msg),
            RepositoryError::AlreadyExists(msg) => ServiceError::Conflict(msg),
            RepositoryError::PreconditionFailed(msg) => ServiceError::Conflict(msg),
            RepositoryError::DatabaseError(msg) => ServiceError::InternalError(msg),
            RepositoryError::ConnectionError(msg) => ServiceError::InternalError(msg),
            RepositoryError::SerializationError(msg) => ServiceError::InternalError(msg),
            RepositoryError::Generic(e) => ServiceError::InternalError(e.to_string()),
        }
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => HandlerError::new(HandlerErrorKind::NotFound, msg),
            ServiceError::InvalidInput(msg) => HandlerError::new(HandlerErrorKind::Validation, msg),
            ServiceError::Conflict(msg) => HandlerError::new(HandlerErrorKind::Conflict, msg),
            ServiceError::PaymentFailed(msg) => {
                HandlerError::new(HandlerErrorKind::PaymentFailed, msg)
            }
            ServiceError::PaymentPending(msg) => {
                HandlerError::new(HandlerErrorKind::PaymentPending, msg)
            }
            ServiceError::ConsistencyFailure { message, reference } => HandlerError {
                error: HandlerErrorKind::PaymentInconsistent,
                message,
                code: Some("payment_recorded_state_inconsistent".to_string()),
                reference: Some(reference),
            },
            ServiceError::InternalError(msg) => HandlerError::new(HandlerErrorKind::Internal, msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency_failure_keeps_reference() {
        let err = ServiceError::ConsistencyFailure {
            message: "deposit recorded at gateway but not locally".to_string(),
            reference: "pi_123".to_string(),
        };
        let handler: HandlerError = err.into();
        assert_eq!(handler.reference.as_deref(), Some("pi_123"));
        assert_eq!(handler.code.as_deref(), Some("payment_recorded_state_inconsistent"));
    }

    #[test]
    fn test_pending_is_distinct_from_failed() {
        let pending: HandlerError = ServiceError::PaymentPending("processing".to_string()).into();
        let failed: HandlerError = ServiceError::PaymentFailed("canceled".to_string()).into();
        assert!(matches!(pending.error, HandlerErrorKind::PaymentPending));
        assert!(matches!(failed.error, HandlerErrorKind::PaymentFailed));
    }
}
