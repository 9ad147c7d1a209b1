use super::{InstanceValidator, RuleKind, ValidationViolation};
use crate::contract::BodySpec;
use serde_json::Value;

/// Request body as seen by the validator
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BodyValue {
    /// No body bytes were sent
    #[default]
    Absent,
    /// Bytes were sent but are not JSON; holds the parser error
    Unparseable(String),
    Json(Value),
}

impl BodyValue {
    /// Interpret raw bytes; empty input counts as no body
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return BodyValue::Absent;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => BodyValue::Json(value),
            Err(e) => BodyValue::Unparseable(e.to_string()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, BodyValue::Absent)
    }
}

impl From<Value> for BodyValue {
    fn from(value: Value) -> Self {
        BodyValue::Json(value)
    }
}

/// Checks a request body against an operation's body declaration
pub struct BodyValidator<'a> {
    instances: &'a InstanceValidator<'a>,
}

impl<'a> BodyValidator<'a> {
    pub fn new(instances: &'a InstanceValidator<'a>) -> Self {
        Self { instances }
    }

    pub fn validate(&self, body: &BodyValue, spec: Option<&BodySpec>) -> Vec<ValidationViolation> {
        let Some(spec) = spec else {
            return vec![];
        };

        match body {
            BodyValue::Absent if spec.required => vec![ValidationViolation::new(
                RuleKind::BodyMissing,
                "",
                "request body is required",
            )],
            BodyValue::Absent => vec![],
            BodyValue::Unparseable(reason) => match &spec.schema {
                Some(_) => vec![ValidationViolation::new(
                    RuleKind::BodyUnparseable,
                    "",
                    format!("request body is not valid JSON: {}", reason),
                )],
                // Non-JSON media types are passed through untouched
                None => vec![],
            },
            BodyValue::Json(value) => match &spec.schema {
                Some(schema) => self.instances.validate(value, schema),
                None => vec![],
            },
        }
    }
}
