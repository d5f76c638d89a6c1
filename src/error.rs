/// Unified Error Handling Module
///
/// Every failure an operation can surface is classified into one of the
/// kinds below and rendered as a structured JSON body keyed by the failing
/// operation name:
///
/// ```json
/// { "errors": { "user_store.find_by_username": ["Username has already been taken."] } }
/// ```
///
/// Nothing is retried and nothing is swallowed: handlers return
/// `Result<HttpResponse, ApiError>` and the `ResponseError` impl logs and
/// maps each kind to its HTTP status.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use crate::store::StoreError;

/// Failure classification for the whole API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Duplicate username or duplicate friendship.
    Conflict,
    /// No matching account or relationship.
    NotFound,
    /// Missing or invalid identity or credentials.
    Unauthorized,
    /// Identity was valid but the session artifact was not
    /// (mismatched, rotated or expired refresh token, insufficient role).
    Forbidden,
    /// The store rejected a write.
    PersistFailed,
    /// Anything unexpected.
    Internal,
}

impl ErrorKind {
    fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::PersistFailed | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::PersistFailed => "persist_failed",
            ErrorKind::Internal => "internal",
        }
    }
}

/// An operation failure: which kind, which operation, and the
/// human-readable reasons the caller gets back.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub operation: String,
    pub reasons: Vec<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, operation: impl Into<String>, reasons: Vec<String>) -> Self {
        Self {
            kind,
            operation: operation.into(),
            reasons,
        }
    }

    pub fn validation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, operation, vec![reason.into()])
    }

    pub fn conflict(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, operation, vec![reason.into()])
    }

    pub fn not_found(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, operation, vec![reason.into()])
    }

    pub fn unauthorized(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, operation, vec![reason.into()])
    }

    pub fn forbidden(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, operation, vec![reason.into()])
    }

    pub fn persist_failed(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::PersistFailed,
            operation,
            vec![reason.to_string()],
        )
    }

    pub fn internal(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Internal, operation, vec![reason.to_string()])
    }

    /// Maps a store failure from a write path.
    ///
    /// Named duplicates and missing foreign-key targets keep their meaning;
    /// everything else is a rejected write.
    pub fn from_store(operation: impl Into<String>, err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => Self::conflict(
                operation,
                format!("{} has already been taken.", capitalize(what)),
            ),
            StoreError::MissingAccount => Self::not_found(operation, "User not found."),
            StoreError::Database(msg) => Self::persist_failed(operation, msg),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}: {}",
            self.kind.as_str(),
            self.operation,
            self.reasons.join("; ")
        )
    }
}

impl StdError for ApiError {}

/// Wire shape of every failure body.
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub errors: HashMap<String, Vec<String>>,
}

impl ErrorBody {
    pub fn new(operation: &str, reasons: &[String]) -> Self {
        let mut errors = HashMap::new();
        errors.insert(operation.to_string(), reasons.to_vec());
        Self { errors }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = self.kind.as_str(),
                reasons = ?self.reasons,
                "request failed"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                kind = self.kind.as_str(),
                reasons = ?self.reasons,
                "request rejected"
            );
        }

        HttpResponse::build(status).json(ErrorBody::new(&self.operation, &self.reasons))
    }
}
