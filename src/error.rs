use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error body sent to clients. Same envelope as success responses, minus data.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// Fixed messages shared between the auth middleware, password utils and handlers.
#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,
    TokenNotProvided,
    InvalidToken,
    UserNoLongerExists,
    PermissionDenied,
    AccountDeactivated,
    ServerError,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max) => {
                format!("Password must not be more than {} characters", max)
            }
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::TokenNotProvided => {
                "You are not logged in, please provide a token".to_string()
            }
            ErrorMessage::InvalidToken => "Token is invalid or expired".to_string(),
            ErrorMessage::UserNoLongerExists => {
                "User belonging to this token no longer exists".to_string()
            }
            ErrorMessage::PermissionDenied => {
                "You are not allowed to perform this action".to_string()
            }
            ErrorMessage::AccountDeactivated => "Your account has been deactivated".to_string(),
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
        };
        write!(f, "{}", message)
    }
}

/// Application error taxonomy.
///
/// A closed set of variants so the HTTP-status mapping is a total match;
/// handlers never pick status codes by inspecting message text.
#[derive(Debug)]
pub enum ApiError {
    /// Missing/malformed input, out-of-range values. 400.
    Validation(String),
    /// Domain rules: duplicate review, self-report, reference-in-use, last-admin guard. 400.
    BusinessRule(String),
    /// Unique-constraint violations, named after the conflicting field. 400.
    Conflict(String),
    /// Missing, invalid or expired credentials. 401.
    Unauthorized(String),
    /// Authenticated but not allowed. 403.
    Forbidden(String),
    /// Absent, or exists but owned by someone else (deliberately indistinguishable). 404.
    NotFound(String),
    /// Driver-level failure. 500, generic message to the client.
    Database(mongodb::error::Error),
    /// Anything else unexpected. 500.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BusinessRule(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(m)
            | ApiError::BusinessRule(m)
            | ApiError::Conflict(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Internal(m) => m.clone(),
            ApiError::Database(_) => ErrorMessage::ServerError.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Database(e) => write!(f, "database error: {}", e),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for ApiError {}

/// Whether a driver error is a duplicate-key write (Mongo error code 11000).
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        // Second line of defense for handlers that did not name the field themselves.
        if is_duplicate_key(&err) {
            return ApiError::Conflict("A record with this value already exists".to_string());
        }
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(ref e) = self {
            tracing::error!("database error: {}", e);
        }
        if let ApiError::Internal(ref m) = self {
            tracing::error!("internal error: {}", m);
        }
        let body = Json(ErrorBody {
            success: false,
            message: self.message(),
        });
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_total() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::BusinessRule("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn database_errors_hide_details_from_clients() {
        let err = ApiError::Internal("boom".into());
        assert_eq!(err.message(), "boom");
        // Database errors never leak driver messages.
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let db_err = ApiError::Database(mongodb::error::Error::from(io));
        assert_eq!(db_err.message(), ErrorMessage::ServerError.to_string());
    }
}
