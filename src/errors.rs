use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
///
/// Business-rule violations (`InvalidState`, `IncompleteEvaluation`,
/// `Conflict`) surface as 4xx with a human-readable reason; store and
/// technical failures surface as 500 with the detail kept in the logs.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Resource not found (loan, user, loan type, catalog version).
    NotFound(String),
    /// Malformed input or missing required request fields.
    Validation(String),
    /// Operation not allowed for the loan's current status.
    InvalidState(String),
    /// Decision requested before score/identity were computed.
    IncompleteEvaluation(String),
    /// Technical failure distinct from a business result (e.g. the
    /// identity verifier missing its inputs).
    Technical(String),
    /// Uniqueness or state conflict (e.g. email already registered).
    Conflict(String),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            AppError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            AppError::IncompleteEvaluation(msg) => write!(f, "Incomplete evaluation: {}", msg),
            AppError::Technical(msg) => write!(f, "Technical failure: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String, Option<String>) {
        match self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::IncompleteEvaluation(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::Technical(msg) => {
                tracing::error!("Technical failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone(), None)
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                let (status, message, _) = source.status_and_message();
                (status, message, Some(context.clone()))
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into the API error envelope:
    /// `{success:false, message, error:{code, message, details?}}`.
    fn into_response(self) -> Response {
        let (status, error_message, details) = self.status_and_message();

        let mut error = json!({
            "code": status.as_u16(),
            "message": error_message,
        });
        if let Some(details) = details {
            error["details"] = json!(details);
        }

        let body = Json(json!({
            "success": false,
            "message": "Request failed",
            "error": error,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error so store operations can name the attempted
/// operation: `.context("delete loan data")`.
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}
