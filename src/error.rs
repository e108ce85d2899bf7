use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error response structure sent to clients
///
/// Example JSON response:
/// ```json
/// {
///   "status": "fail",
///   "message": "Token is invalid or expired"
/// }
/// ```
///
/// `ErrorResponse` is the external shape; `HttpError` is what handlers and
/// middleware return internally.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String, // Always "fail"
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Fixed, user-facing error messages
#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    // Authentication errors
    InvalidToken,
    TokenNotProvided,
    UserNotAuthenticated,
    InvalidConfirmationCode,

    // Authorization errors
    PermissionDenied,

    // User management errors
    UserNoLongerExist,
    UsernameEmailMismatch,

    //Else
    ServerError,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessage::UserNoLongerExist => "User belonging to this token no longer exists",
            ErrorMessage::InvalidToken => "Token is invalid or expired",
            ErrorMessage::TokenNotProvided => "You are not logged in, please provide a token",
            ErrorMessage::UserNotAuthenticated => "Authentication required. Please log in.",
            ErrorMessage::InvalidConfirmationCode => "Confirmation code is invalid or expired",
            ErrorMessage::PermissionDenied => "You are not allowed to perform this action",
            ErrorMessage::UsernameEmailMismatch => "username/email combination invalid",
            ErrorMessage::ServerError => "Server Error. Please try again later",
        };
        write!(f, "{}", message)
    }
}

/// Domain error taxonomy shared by the stores, the services and the importer.
///
/// Every variant except `Database` carries a message that is safe to show to
/// the caller. `Database` is anything sqlx reported that is not a constraint
/// violation we know how to classify.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CatalogError::NotFound(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        CatalogError::Duplicate(message.into())
    }
}

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("unique constraint");
                    return CatalogError::Duplicate(format!("Violates {}", constraint));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("foreign key");
                    return CatalogError::NotFound(format!(
                        "Referenced object does not exist ({})",
                        constraint
                    ));
                }
                _ => {}
            }
        }
        if let sqlx::Error::RowNotFound = err {
            return CatalogError::NotFound("Not found".to_string());
        }
        CatalogError::Database(err)
    }
}

/// Internal HTTP error type used throughout the application
///
/// Handlers return `Result<T, HttpError>`; axum turns the error into a JSON
/// response through `IntoResponse`.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
}

impl HttpError {
    /// 500 Internal Server Error
    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// 409 Conflict, for database constraint violations
    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::CONFLICT,
        }
    }

    /// 401 Unauthorized
    ///
    /// Note: Despite the name, 401 means "unauthenticated", not "unauthorized"
    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    /// 403 Forbidden: authenticated, but not allowed
    pub fn forbidden(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::FORBIDDEN,
        }
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            status: "fail".to_string(),
            message: self.message.clone(),
        });

        (self.status, json_response).into_response()
    }
}

impl From<CatalogError> for HttpError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(message) => HttpError::bad_request(message),
            CatalogError::NotFound(message) => HttpError::not_found(message),
            // Signup identity mismatch is reported as a plain bad request
            CatalogError::Conflict(message) => HttpError::bad_request(message),
            CatalogError::Duplicate(message) => HttpError::unique_constraint_violation(message),
            CatalogError::Authentication(message) => HttpError::unauthorized(message),
            CatalogError::Authorization(message) => HttpError::forbidden(message),
            CatalogError::Database(e) => {
                tracing::error!("DB error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_map_to_distinct_statuses() {
        let cases = [
            (CatalogError::validation("bad"), StatusCode::BAD_REQUEST),
            (CatalogError::not_found("missing"), StatusCode::NOT_FOUND),
            (CatalogError::Conflict("pair".into()), StatusCode::BAD_REQUEST),
            (CatalogError::duplicate("dup"), StatusCode::CONFLICT),
            (CatalogError::Authentication("who".into()), StatusCode::UNAUTHORIZED),
            (CatalogError::Authorization("no".into()), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(HttpError::from(err).status, status);
        }
    }

    #[test]
    fn row_not_found_becomes_not_found() {
        let err = CatalogError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn database_errors_hide_details_from_clients() {
        let err = CatalogError::Database(sqlx::Error::PoolTimedOut);
        let http = HttpError::from(err);
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http.message, ErrorMessage::ServerError.to_string());
    }
}
