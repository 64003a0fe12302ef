// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::{SocialLoginError, TokenError};
use crate::database::manager::DatabaseError;
use crate::database::pagination::PageError;
use crate::database::repository::{CredentialError, MachineCodeError};
use crate::services::AuthError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),
    /// Duplicate username/phone. Reported as 400, not 409.
    Conflict(String),
    InvalidCredential(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    WriteFailed(String),
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Conflict(_) => 400,
            ApiError::InvalidCredential(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::WriteFailed(_) => 500,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InvalidCredential(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::WriteFailed(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Stable tag for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::WriteFailed(_) => "WRITE_FAILED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "code": self.status_code(),
            "message": self.message(),
            "error": self.error_code(),
        });

        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["fieldErrors"] = json!(field_errors);
        }

        response
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Validation failure attributed to a single request field.
    pub fn field_error(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        ApiError::validation_error(message, Some(field_errors))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::WriteFailed(e) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Transaction rolled back: {}", e);
                ApiError::WriteFailed("Failed to save changes".to_string())
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) | DatabaseError::Sqlx(sqlx::Error::Io(_)) => {
                tracing::error!("Database unreachable: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredential => ApiError::InvalidCredential(err.to_string()),
            CredentialError::AccountDisabled => ApiError::forbidden(err.to_string()),
            CredentialError::Conflict(msg) => ApiError::conflict(msg),
            CredentialError::NotFound => ApiError::not_found(err.to_string()),
            CredentialError::Password(e) => {
                tracing::error!("Password hashing error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            CredentialError::Database(e) => e.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => ApiError::unauthorized("Invalid token"),
            TokenError::Expired => ApiError::unauthorized("Token has expired"),
            TokenError::Generation(_) | TokenError::MissingSecret => {
                tracing::error!("Token issuance failed: {}", err);
                ApiError::internal_server_error("Failed to issue token")
            }
        }
    }
}

impl From<SocialLoginError> for ApiError {
    fn from(err: SocialLoginError) -> Self {
        match err {
            SocialLoginError::NotConfigured => {
                ApiError::service_unavailable("WeChat login is not available")
            }
            SocialLoginError::Transport(_) | SocialLoginError::Rejected { .. } | SocialLoginError::MissingOpenId => {
                ApiError::bad_gateway(format!("WeChat login failed: {}", err))
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation { field, message } => ApiError::field_error(field, message),
            AuthError::Credential(e) => e.into(),
            AuthError::Token(e) => e.into(),
            AuthError::Social(e) => e.into(),
        }
    }
}

impl From<MachineCodeError> for ApiError {
    fn from(err: MachineCodeError) -> Self {
        match err {
            MachineCodeError::NotFound | MachineCodeError::NotBound | MachineCodeError::UserNotFound => {
                ApiError::not_found(err.to_string())
            }
            MachineCodeError::Disabled
            | MachineCodeError::AlreadyBound
            | MachineCodeError::UserAlreadyBound => ApiError::forbidden(err.to_string()),
            MachineCodeError::Database(e) => e.into(),
        }
    }
}

impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        let field = match &err {
            PageError::NotPositive { field } => *field,
            PageError::TooLarge { .. } => "pageSize",
        };
        ApiError::field_error(field, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let body = ApiError::not_found("Compost record not found").to_json();
        assert_eq!(body["code"], 404);
        assert_eq!(body["message"], "Compost record not found");
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[test]
    fn duplicates_and_bad_logins_are_400() {
        let conflict: ApiError = CredentialError::Conflict("Username already exists".into()).into();
        assert_eq!(conflict.status_code(), 400);
        assert_eq!(conflict.error_code(), "CONFLICT");

        let login: ApiError = CredentialError::InvalidCredential.into();
        assert_eq!(login.status_code(), 400);
    }

    #[test]
    fn token_failures_are_401() {
        assert_eq!(ApiError::from(TokenError::Expired).status_code(), 401);
        assert_eq!(ApiError::from(TokenError::Invalid("x".into())).status_code(), 401);
        assert_eq!(ApiError::from(TokenError::MissingSecret).status_code(), 500);
    }

    #[test]
    fn machine_code_mapping() {
        assert_eq!(ApiError::from(MachineCodeError::AlreadyBound).status_code(), 403);
        assert_eq!(ApiError::from(MachineCodeError::Disabled).status_code(), 403);
        assert_eq!(ApiError::from(MachineCodeError::UserAlreadyBound).status_code(), 403);
        assert_eq!(ApiError::from(MachineCodeError::NotBound).status_code(), 404);
        assert_eq!(ApiError::from(MachineCodeError::NotFound).status_code(), 404);
    }

    #[test]
    fn sql_errors_are_masked() {
        let err: ApiError = DatabaseError::Sqlx(sqlx::Error::RowNotFound).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Database error occurred");

        let err: ApiError = DatabaseError::write_failed(sqlx::Error::RowNotFound).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "WRITE_FAILED");
    }

    #[test]
    fn social_failures_are_bad_gateway() {
        let err: ApiError = SocialLoginError::Rejected { code: 40029, message: "invalid code".into() }.into();
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn validation_errors_carry_fields() {
        let body = ApiError::from(PageError::NotPositive { field: "page" }).to_json();
        assert_eq!(body["code"], 400);
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert!(body["fieldErrors"].get("page").is_some());
    }
}
