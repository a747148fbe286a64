//! Result/error utilities threaded through every fallible core operation.
//!
//! [`AppError`] is the sum-type failure value every store, validator, adapter, and
//! auth call returns. It never crosses the HTTP boundary directly: the server's
//! error-handling layer converts it into a [`Problem`], mirroring how the teacher
//! codebase keeps `thiserror` domain errors internal and only renders RFC 9457
//! `Problem` documents at the edge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The error kinds named in the specification (not Rust type names — a single
/// `AppError` carries one of these as a tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ConfigInvalid,
    Io,
    NotFound,
    Conflict,
    Validation,
    Unauthorized,
    Forbidden,
    ExpansionDepth,
    BadRequest,
    Internal,
}

impl ErrorKind {
    /// Maps a kind to the HTTP status used at the boundary (§7 of the spec).
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 400,
            ErrorKind::Validation | ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::ExpansionDepth => 400,
            ErrorKind::Internal | ErrorKind::Io => 500,
            ErrorKind::ConfigInvalid => 500,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "Configuration Invalid",
            ErrorKind::Io => "IO Error",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Validation => "Validation Failed",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::ExpansionDepth => "Expansion Depth Exceeded",
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Internal => "Internal Server Error",
        }
    }
}

/// A single field-level validation violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub rule: String,
    pub detail: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, rule: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            detail: detail.into(),
        }
    }
}

/// The sum-type failure value returned by every fallible core operation.
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub code: Option<String>,
    pub issues: Vec<ValidationIssue>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            issues: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_issues(mut self, issues: Vec<ValidationIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        Self::new(ErrorKind::Validation, "validation failed").with_issues(issues)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn expansion_depth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExpansionDepth, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

/// RFC 9457 Problem Details body, per §6 of the spec (`{status, message, code?,
/// details?}`), rendered with the extra `title`/`type` fields the teacher's own
/// `Problem` type carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub message: String,
    pub code: Option<String>,
    pub details: Option<Vec<ValidationIssue>>,
}

impl Problem {
    pub fn from_app_error(err: &AppError) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: err.kind.title().to_string(),
            status: err.kind.status(),
            message: err.message.clone(),
            code: err.code.clone(),
            details: if err.issues.is_empty() {
                None
            } else {
                Some(err.issues.clone())
            },
        }
    }
}

impl From<&AppError> for Problem {
    fn from(err: &AppError) -> Self {
        Problem::from_app_error(err)
    }
}

impl From<AppError> for Problem {
    fn from(err: AppError) -> Self {
        Problem::from_app_error(&err)
    }
}

mod axum_support {
    use super::{AppError, Problem};
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };

    impl IntoResponse for Problem {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(self)).into_response()
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            Problem::from_app_error(&self).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_status_mapping_matches_spec() {
        assert_eq!(ErrorKind::NotFound.status(), 404);
        assert_eq!(ErrorKind::Conflict.status(), 400);
        assert_eq!(ErrorKind::Validation.status(), 400);
        assert_eq!(ErrorKind::Unauthorized.status(), 401);
        assert_eq!(ErrorKind::Forbidden.status(), 403);
        assert_eq!(ErrorKind::Internal.status(), 500);
        assert_eq!(ErrorKind::Io.status(), 500);
    }

    #[test]
    fn validation_error_carries_issues() {
        let issues = vec![ValidationIssue::new("email", "required", "email is required")];
        let err = AppError::validation(issues.clone());
        let problem = Problem::from_app_error(&err);
        assert_eq!(problem.status, 400);
        assert_eq!(problem.details.unwrap().len(), 1);
    }

    #[test]
    fn not_found_builder_sets_kind() {
        let err = AppError::not_found("user 42 missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "user 42 missing");
    }
}
