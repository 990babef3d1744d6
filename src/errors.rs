use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for the keke-napepe service
#[derive(Debug)]
pub enum KekeError {
    // HTTP and API errors
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    InternalServer(String),

    // Business logic errors
    UserNotFound(String),
    DriverNotFound(String),
    RideNotFound(String),
    OrderNotFound(String),
    WithdrawalNotFound(String),
    AlertNotFound(String),
    JobNotFound(String),
    InvalidTransition { entity: String, from: String, to: String },
    DriverNotAvailable(String),
    NoDriverAvailable(String),
    DriverNotAssigned { ride_id: String, driver_id: String },
    NoEarningsToWithdraw(String),
    WithdrawalAlreadyProcessed(String),

    // Validation errors
    ValidationFailed(Vec<ValidationError>),
    MissingRequiredField(String),
    InvalidFieldValue { field: String, value: String, reason: String },

    // Configuration errors
    InvalidConfiguration(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl fmt::Display for KekeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KekeError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            KekeError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            KekeError::NotFound(msg) => write!(f, "Not found: {}", msg),
            KekeError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            KekeError::InternalServer(msg) => write!(f, "Internal server error: {}", msg),

            KekeError::UserNotFound(id) => write!(f, "User not found: {}", id),
            KekeError::DriverNotFound(id) => write!(f, "Driver not found: {}", id),
            KekeError::RideNotFound(id) => write!(f, "Ride not found: {}", id),
            KekeError::OrderNotFound(id) => write!(f, "Order not found: {}", id),
            KekeError::WithdrawalNotFound(id) => write!(f, "Withdrawal request not found: {}", id),
            KekeError::AlertNotFound(id) => write!(f, "Fraud alert not found: {}", id),
            KekeError::JobNotFound(name) => write!(f, "Scheduled job not found: {}", name),
            KekeError::InvalidTransition { entity, from, to } => {
                write!(f, "Cannot move {} from {} to {}", entity, from, to)
            }
            KekeError::DriverNotAvailable(id) => write!(f, "Driver is not available: {}", id),
            KekeError::NoDriverAvailable(vehicle) => write!(f, "No {} driver is available", vehicle),
            KekeError::DriverNotAssigned { ride_id, driver_id } => {
                write!(f, "Driver {} is not assigned to ride {}", driver_id, ride_id)
            }
            KekeError::NoEarningsToWithdraw(id) => write!(f, "Driver {} has no earnings to withdraw", id),
            KekeError::WithdrawalAlreadyProcessed(id) => {
                write!(f, "Withdrawal request already processed: {}", id)
            }

            KekeError::ValidationFailed(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            KekeError::MissingRequiredField(field) => write!(f, "Missing required field: {}", field),
            KekeError::InvalidFieldValue { field, value, reason } => {
                write!(f, "Invalid value '{}' for field '{}': {}", value, field, reason)
            }

            KekeError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for KekeError {}

impl IntoResponse for KekeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_type, message, details) = match self {
            KekeError::BadRequest(msg) => ("bad_request", msg, None),
            KekeError::Forbidden(msg) => ("forbidden", msg, None),
            KekeError::NotFound(msg) => ("not_found", msg, None),
            KekeError::Conflict(msg) => ("conflict", msg, None),

            KekeError::ValidationFailed(errors) => {
                let details = serde_json::to_value(&errors).ok();
                ("validation_failed", "Validation errors occurred".to_string(), details)
            }
            KekeError::MissingRequiredField(field) => {
                ("missing_field", format!("Missing required field: {}", field), None)
            }
            KekeError::InvalidFieldValue { field, reason, .. } => {
                ("invalid_field", format!("Invalid value for {}: {}", field, reason), None)
            }

            err @ KekeError::UserNotFound(_) => ("user_not_found", err.to_string(), None),
            err @ KekeError::DriverNotFound(_) => ("driver_not_found", err.to_string(), None),
            err @ KekeError::RideNotFound(_) => ("ride_not_found", err.to_string(), None),
            err @ KekeError::OrderNotFound(_) => ("order_not_found", err.to_string(), None),
            err @ KekeError::WithdrawalNotFound(_) => ("withdrawal_not_found", err.to_string(), None),
            err @ KekeError::AlertNotFound(_) => ("alert_not_found", err.to_string(), None),
            err @ KekeError::JobNotFound(_) => ("job_not_found", err.to_string(), None),

            err @ KekeError::InvalidTransition { .. } => ("invalid_transition", err.to_string(), None),
            err @ KekeError::DriverNotAvailable(_) => ("driver_not_available", err.to_string(), None),
            err @ KekeError::NoDriverAvailable(_) => ("no_driver_available", err.to_string(), None),
            err @ KekeError::DriverNotAssigned { .. } => ("driver_not_assigned", err.to_string(), None),
            err @ KekeError::NoEarningsToWithdraw(_) => ("no_earnings", err.to_string(), None),
            err @ KekeError::WithdrawalAlreadyProcessed(_) => ("withdrawal_already_processed", err.to_string(), None),

            // All other errors are treated as internal server errors
            other => ("internal_error", other.to_string(), None),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, axum::Json(error_response)).into_response()
    }
}

// Convenience type alias for Results
pub type KekeResult<T> = Result<T, KekeError>;

// Helper functions for creating common errors
impl KekeError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        KekeError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        KekeError::Forbidden(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        KekeError::NotFound(resource.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        KekeError::InternalServer(msg.into())
    }

    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        KekeError::ValidationFailed(vec![ValidationError {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn invalid_transition(entity: impl Into<String>, from: impl fmt::Debug, to: impl fmt::Debug) -> Self {
        KekeError::InvalidTransition {
            entity: entity.into(),
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        }
    }

    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        KekeError::UserNotFound(user_id.into())
    }

    pub fn driver_not_found(driver_id: impl Into<String>) -> Self {
        KekeError::DriverNotFound(driver_id.into())
    }

    pub fn ride_not_found(ride_id: impl Into<String>) -> Self {
        KekeError::RideNotFound(ride_id.into())
    }

    /// HTTP status this error maps to, without building a response body.
    pub fn status_code(&self) -> StatusCode {
        match self {
            KekeError::BadRequest(_)
            | KekeError::ValidationFailed(_)
            | KekeError::MissingRequiredField(_)
            | KekeError::InvalidFieldValue { .. } => StatusCode::BAD_REQUEST,
            KekeError::Forbidden(_) | KekeError::DriverNotAssigned { .. } => StatusCode::FORBIDDEN,
            KekeError::NotFound(_)
            | KekeError::UserNotFound(_)
            | KekeError::DriverNotFound(_)
            | KekeError::RideNotFound(_)
            | KekeError::OrderNotFound(_)
            | KekeError::WithdrawalNotFound(_)
            | KekeError::AlertNotFound(_)
            | KekeError::JobNotFound(_) => StatusCode::NOT_FOUND,
            KekeError::Conflict(_)
            | KekeError::InvalidTransition { .. }
            | KekeError::DriverNotAvailable(_)
            | KekeError::NoDriverAvailable(_)
            | KekeError::NoEarningsToWithdraw(_)
            | KekeError::WithdrawalAlreadyProcessed(_) => StatusCode::CONFLICT,
            KekeError::InternalServer(_) | KekeError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = KekeError::RideNotFound("rid-261016-a1b2c".to_string());
        assert_eq!(error.to_string(), "Ride not found: rid-261016-a1b2c");
    }

    #[test]
    fn test_validation_error() {
        let error = KekeError::validation_error("amount", "Amount must be positive");
        match error {
            KekeError::ValidationFailed(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "amount");
                assert_eq!(errors[0].message, "Amount must be positive");
            }
            _ => panic!("Expected ValidationFailed error"),
        }
    }

    #[test]
    fn test_invalid_transition_message() {
        let error = KekeError::invalid_transition("ride", "Completed", "Cancelled");
        assert_eq!(error.to_string(), "Cannot move ride from \"Completed\" to \"Cancelled\"");
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(KekeError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(KekeError::user_not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(KekeError::internal_error("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            KekeError::NoEarningsToWithdraw("drv".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_response_uses_mapped_status() {
        let response = KekeError::ride_not_found("rid-261016-a1b2c").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = KekeError::InvalidConfiguration("KEKE_SURGE".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
