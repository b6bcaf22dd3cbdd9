use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the guard and the content services.
///
/// Domain variants carry a stable machine code (`ATHR-001`, `QUES-001`, ...)
/// next to the message shown to the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    AuthRequired { code: &'static str, message: String },
    #[error("{message}")]
    SessionEnded { code: &'static str, message: String },
    #[error("{message}")]
    AuthenticationFailed { code: &'static str, message: String },
    #[error("{message}")]
    NotFound { code: &'static str, message: String },
    #[error("{message}")]
    OwnershipViolation { code: &'static str, message: String },
    #[error("{message}")]
    SignupConflict { code: &'static str, message: String },
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn auth_required(code: &'static str, message: impl Into<String>) -> Self {
        Self::AuthRequired { code, message: message.into() }
    }

    pub fn session_ended(code: &'static str, message: impl Into<String>) -> Self {
        Self::SessionEnded { code, message: message.into() }
    }

    pub fn authentication_failed(code: &'static str, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { code, message: message.into() }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound { code, message: message.into() }
    }

    pub fn ownership(code: &'static str, message: impl Into<String>) -> Self {
        Self::OwnershipViolation { code, message: message.into() }
    }

    pub fn signup_conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::SignupConflict { code, message: message.into() }
    }

    pub fn username_taken() -> Self {
        Self::signup_conflict(
            "SGR-001",
            "Try any other Username, this Username has already been taken",
        )
    }

    pub fn email_taken() -> Self {
        Self::signup_conflict(
            "SGR-002",
            "This user has already been registered, try with any other emailId",
        )
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    /// Kind name as it appears in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthRequired { .. } => "AUTH_REQUIRED",
            Self::SessionEnded { .. } => "SESSION_ENDED",
            Self::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::OwnershipViolation { .. } => "OWNERSHIP_VIOLATION",
            Self::SignupConflict { .. } => "SIGNUP_CONFLICT",
            Self::Validation(_) => "VALIDATION",
            Self::Database(_) => "DB_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Machine code sent to the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRequired { code, .. }
            | Self::SessionEnded { code, .. }
            | Self::AuthenticationFailed { code, .. }
            | Self::NotFound { code, .. }
            | Self::OwnershipViolation { code, .. }
            | Self::SignupConflict { code, .. } => code,
            Self::Validation(_) => "VAL-001",
            Self::Database(_) | Self::Internal(_) => "GEN-001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthRequired { .. }
            | Self::SessionEnded { .. }
            | Self::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::OwnershipViolation { .. } => StatusCode::FORBIDDEN,
            Self::SignupConflict { .. } => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => {
                error!(error = %self, kind = self.kind(), "request failed");
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse {
            code: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_distinct_status_classes() {
        let cases = [
            (AppError::auth_required("ATHR-001", "x"), StatusCode::UNAUTHORIZED),
            (AppError::session_ended("ATHR-002", "x"), StatusCode::UNAUTHORIZED),
            (AppError::not_found("QUES-001", "x"), StatusCode::NOT_FOUND),
            (AppError::ownership("ATHR-003", "x"), StatusCode::FORBIDDEN),
            (AppError::signup_conflict("SGR-001", "x"), StatusCode::CONFLICT),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err.kind());
        }
    }

    #[test]
    fn code_and_message_come_from_the_variant() {
        let err = AppError::not_found("ANS-001", "Entered answer uuid does not exist");
        assert_eq!(err.code(), "ANS-001");
        assert_eq!(err.to_string(), "Entered answer uuid does not exist");
        assert_eq!(err.kind(), "NOT_FOUND");
    }

    #[test]
    fn infrastructure_errors_hide_details() {
        let resp = AppError::internal("secret detail").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
