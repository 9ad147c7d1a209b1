mod body;
mod formats;
mod instance;
mod parameters;

pub use body::{BodyValidator, BodyValue};
pub use formats::{FormatChecker, FormatPolicy};
pub use instance::InstanceValidator;
pub use parameters::{ParameterValidator, QueryParams};

use crate::contract::Location;
use serde::Serialize;

/// Which rule a violation broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    // Schema keywords
    Type,
    Required,
    AdditionalProperties,
    MinProperties,
    MaxProperties,
    Enum,
    Const,
    Format,
    Minimum,
    Maximum,
    MultipleOf,
    MinLength,
    MaxLength,
    Pattern,
    MinItems,
    MaxItems,
    UniqueItems,
    AnyOf,
    OneOf,
    UnresolvedRef,

    // Parameter checks
    MissingParameter,
    ParameterType,

    // Body checks
    BodyMissing,
    BodyUnparseable,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Type => write!(f, "type"),
            RuleKind::Required => write!(f, "required"),
            RuleKind::AdditionalProperties => write!(f, "additionalProperties"),
            RuleKind::MinProperties => write!(f, "minProperties"),
            RuleKind::MaxProperties => write!(f, "maxProperties"),
            RuleKind::Enum => write!(f, "enum"),
            RuleKind::Const => write!(f, "const"),
            RuleKind::Format => write!(f, "format"),
            RuleKind::Minimum => write!(f, "minimum"),
            RuleKind::Maximum => write!(f, "maximum"),
            RuleKind::MultipleOf => write!(f, "multipleOf"),
            RuleKind::MinLength => write!(f, "minLength"),
            RuleKind::MaxLength => write!(f, "maxLength"),
            RuleKind::Pattern => write!(f, "pattern"),
            RuleKind::MinItems => write!(f, "minItems"),
            RuleKind::MaxItems => write!(f, "maxItems"),
            RuleKind::UniqueItems => write!(f, "uniqueItems"),
            RuleKind::AnyOf => write!(f, "anyOf"),
            RuleKind::OneOf => write!(f, "oneOf"),
            RuleKind::UnresolvedRef => write!(f, "$ref"),
            RuleKind::MissingParameter => write!(f, "missing parameter"),
            RuleKind::ParameterType => write!(f, "parameter type"),
            RuleKind::BodyMissing => write!(f, "body missing"),
            RuleKind::BodyUnparseable => write!(f, "body unparseable"),
        }
    }
}

/// A single located mismatch between a request element and the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationViolation {
    pub location: Location,
    /// JSON pointer into the body (`/shipDate`) or the parameter name
    pub pointer: String,
    pub message: String,
    pub rule: RuleKind,
}

impl ValidationViolation {
    pub fn new(rule: RuleKind, pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: Location::Body,
            pointer: pointer.into(),
            message: message.into(),
            rule,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Format violation with its location context
    pub fn format(&self) -> String {
        let pointer = if self.pointer.is_empty() { "/" } else { &self.pointer };
        format!("[{}: {}] {}", self.location, pointer, self.message)
    }
}

/// Append one reference token to a JSON pointer
pub(crate) fn child_pointer(parent: &str, token: &str) -> String {
    format!("{}/{}", parent, token.replace('~', "~0").replace('/', "~1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_pointer_escapes_tokens() {
        assert_eq!(child_pointer("", "shipDate"), "/shipDate");
        assert_eq!(child_pointer("/tags", "0"), "/tags/0");
        assert_eq!(child_pointer("", "a/b~c"), "/a~1b~0c");
    }

    #[test]
    fn test_violation_format() {
        let violation = ValidationViolation::new(RuleKind::Format, "/shipDate", "bad date");
        assert_eq!(violation.format(), "[body: /shipDate] bad date");

        let violation = ValidationViolation::new(RuleKind::MissingParameter, "api_key", "missing")
            .with_location(Location::Header);
        assert_eq!(violation.format(), "[header: api_key] missing");
    }
}
