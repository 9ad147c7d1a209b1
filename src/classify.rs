//! Maps routing and validation outcomes onto stable error codes.

use crate::contract::HttpMethod;
use crate::routing::UnmatchedKind;
use crate::validation::{RuleKind, ValidationViolation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Request-time failure taxonomy. Codes never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PathNotFound,
    MethodNotAllowed,
    RequiredParameterMissing,
    ParameterTypeMismatch,
    RequestBodySchemaMismatch,
    RequestBodyMissing,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::PathNotFound => "ERR10007",
            ErrorKind::MethodNotAllowed => "ERR10008",
            ErrorKind::RequiredParameterMissing => "ERR11017",
            ErrorKind::ParameterTypeMismatch => "ERR11011",
            ErrorKind::RequestBodySchemaMismatch => "ERR11004",
            ErrorKind::RequestBodyMissing => "ERR11014",
        }
    }

    pub fn status(&self) -> http::StatusCode {
        match self {
            ErrorKind::PathNotFound => http::StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::RequiredParameterMissing
            | ErrorKind::ParameterTypeMismatch
            | ErrorKind::RequestBodySchemaMismatch
            | ErrorKind::RequestBodyMissing => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PathNotFound => "PathNotFound",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::RequiredParameterMissing => "RequiredParameterMissing",
            ErrorKind::ParameterTypeMismatch => "ParameterTypeMismatch",
            ErrorKind::RequestBodySchemaMismatch => "RequestBodySchemaMismatch",
            ErrorKind::RequestBodyMissing => "RequestBodyMissing",
        };
        f.write_str(name)
    }
}

/// A classified request failure
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} {}", .kind.code(), .message)]
pub struct ValidationFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub violations: Vec<ValidationViolation>,
    /// Set only for `MethodNotAllowed`
    pub allowed_methods: Vec<HttpMethod>,
}

impl ValidationFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            violations: vec![],
            allowed_methods: vec![],
        }
    }

    pub fn status(&self) -> http::StatusCode {
        self.kind.status()
    }

    /// Value for the `Allow` response header, e.g. `PUT, POST`
    pub fn allow_header(&self) -> Option<String> {
        if self.allowed_methods.is_empty() {
            return None;
        }
        Some(
            self.allowed_methods
                .iter()
                .map(HttpMethod::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.kind.code().to_string(),
            message: self.message.clone(),
            violations: self
                .violations
                .iter()
                .map(|v| ViolationPayload {
                    path: v.pointer.clone(),
                    message: v.message.clone(),
                })
                .collect(),
            allowed_methods: self
                .allowed_methods
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
        }
    }
}

/// Wire form of a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<ViolationPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationPayload {
    pub path: String,
    pub message: String,
}

/// Classify a routing miss
pub fn classify_route(
    kind: UnmatchedKind,
    method: &http::Method,
    path: &str,
    allowed_methods: Vec<HttpMethod>,
) -> ValidationFailure {
    match kind {
        UnmatchedKind::NoPath => ValidationFailure::new(
            ErrorKind::PathNotFound,
            format!("Request path {} cannot be found in the contract", path),
        ),
        UnmatchedKind::WrongMethod => ValidationFailure {
            allowed_methods,
            ..ValidationFailure::new(
                ErrorKind::MethodNotAllowed,
                format!("Request method {} is not allowed on path {}", method, path),
            )
        },
    }
}

/// Classify parameter violations; `None` when there are none
pub fn classify_parameters(
    operation: &str,
    violations: Vec<ValidationViolation>,
) -> Option<ValidationFailure> {
    if violations.is_empty() {
        return None;
    }
    let missing = violations
        .iter()
        .any(|v| v.rule == RuleKind::MissingParameter);
    let (kind, message) = if missing {
        (
            ErrorKind::RequiredParameterMissing,
            format!("Required parameter missing for {}", operation),
        )
    } else {
        (
            ErrorKind::ParameterTypeMismatch,
            format!("Parameter validation failed for {}", operation),
        )
    };
    Some(ValidationFailure {
        violations,
        ..ValidationFailure::new(kind, message)
    })
}

/// Classify body violations; `None` when there are none
pub fn classify_body(
    operation: &str,
    violations: Vec<ValidationViolation>,
) -> Option<ValidationFailure> {
    if violations.is_empty() {
        return None;
    }
    let missing = violations.iter().any(|v| v.rule == RuleKind::BodyMissing);
    let (kind, message) = if missing {
        (
            ErrorKind::RequestBodyMissing,
            format!("{} requires a request body, none found", operation),
        )
    } else {
        (
            ErrorKind::RequestBodySchemaMismatch,
            format!("Request body does not match the schema of {}", operation),
        )
    };
    Some(ValidationFailure {
        violations,
        ..ValidationFailure::new(kind, message)
    })
}
