use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::NonceError;
use crate::domain::{ConversionError, InvalidTransition};
use crate::ports::RepositoryError;
use crate::upstream::UpstreamError;
use crate::validation::{FieldErrors, ValidationError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    InsufficientBalance(String),

    #[error("{0}")]
    BelowMinimum(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment was not approved: {0}")]
    PaymentRejected(String),

    #[error("Payment could not be verified: {0}")]
    VerificationMismatch(String),

    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientBalance(_)
            | AppError::BelowMinimum(_)
            | AppError::VerificationMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentRejected(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            AppError::BelowMinimum(_) => "BELOW_MINIMUM",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PaymentRejected(_) => "PAYMENT_REJECTED",
            AppError::VerificationMismatch(_) => "VERIFICATION_MISMATCH",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The client may resend the same request later; the response carries
    /// `"retryable": true`. Nothing is retried on the server. A retryable
    /// verification failure leaves the record pending with its signed
    /// transaction id, so signature expiry does not fail it meanwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::UpstreamUnavailable(_))
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Please correct the highlighted fields".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            AppError::VerificationMismatch(_) => {
                "Payment could not be verified. Please contact support.".to_string()
            }
            AppError::UpstreamUnavailable(_) => {
                "A required service is temporarily unavailable. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": self.public_message(),
            "code": self.code(),
        });

        match &self {
            AppError::Validation(fields) => {
                body["fields"] = json!(fields);
            }
            AppError::Database(detail) | AppError::Internal(detail) => {
                tracing::error!(code = self.code(), "{}", detail);
            }
            AppError::UpstreamUnavailable(detail) | AppError::VerificationMismatch(detail) => {
                tracing::warn!(code = self.code(), "{}", detail);
                body["details"] = json!(detail);
            }
            _ => {}
        }
        if self.is_retryable() {
            body["retryable"] = json!(true);
        }

        (status, Json(body)).into_response()
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        AppError::Validation(error.into())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            RepositoryError::Conflict(what) => AppError::Conflict(what),
            RepositoryError::Database(detail) => AppError::Database(detail),
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::InvalidAmount => {
                ValidationError::new("amount", err.to_string()).into()
            }
            ConversionError::InsufficientBalance { .. } => {
                AppError::InsufficientBalance(err.to_string())
            }
            ConversionError::BelowMinimum { .. } => AppError::BelowMinimum(err.to_string()),
            ConversionError::PriceUnavailable(_) => AppError::UpstreamUnavailable(err.to_string()),
        }
    }
}

impl From<NonceError> for AppError {
    fn from(err: NonceError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::Conflict(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    async fn body_of(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PaymentRejected("x".into()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::VerificationMismatch("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::UpstreamUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let mut fields = FieldErrors::new();
        fields.push(ValidationError::new("upiId", "Please enter a valid UPI ID"));

        let (status, body) = body_of(AppError::Validation(fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fields"]["upiId"], "Please enter a valid UPI ID");
    }

    #[tokio::test]
    async fn test_below_minimum_carries_message() {
        let err: AppError = ConversionError::BelowMinimum {
            minimum: BigDecimal::from(500),
            final_amount: BigDecimal::from(71),
        }
        .into();

        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Minimum conversion amount is ₹500");
        assert_eq!(body["code"], "BELOW_MINIMUM");
    }

    #[tokio::test]
    async fn test_database_details_are_hidden() {
        let (status, body) = body_of(AppError::Database("password leaked".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_upstream_errors_are_retryable() {
        let err: AppError = UpstreamError::CircuitBreakerOpen("verifier".into()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retryable() {
        for err in [
            AppError::BadRequest("x".into()),
            AppError::VerificationMismatch("x".into()),
            AppError::PaymentRejected("x".into()),
            AppError::Database("x".into()),
        ] {
            assert!(!err.is_retryable());
            let (_, body) = body_of(err).await;
            assert!(body.get("retryable").is_none());
        }
    }

    #[test]
    fn test_repository_errors_map() {
        assert!(matches!(
            AppError::from(RepositoryError::Conflict("dup".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::NotFound("x".into())),
            AppError::NotFound(_)
        ));
    }
}
