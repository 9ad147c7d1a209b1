use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use validator::ValidateEmail;

/// How a failed `format` check is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatPolicy {
    /// Report a violation
    #[default]
    Enforce,
    /// Log a warning and accept the value
    Warn,
    /// Skip the check entirely
    Ignore,
}

/// Format checks with a per-format policy
#[derive(Debug, Clone, Default)]
pub struct FormatChecker {
    default_policy: FormatPolicy,
    overrides: HashMap<String, FormatPolicy>,
}

impl FormatChecker {
    pub fn new(default_policy: FormatPolicy, overrides: HashMap<String, FormatPolicy>) -> Self {
        Self {
            default_policy,
            overrides,
        }
    }

    pub fn policy(&self, format: &str) -> FormatPolicy {
        self.overrides
            .get(format)
            .copied()
            .unwrap_or(self.default_policy)
    }

    /// Check a string against a format; `None` for formats we do not know
    pub fn check_str(&self, format: &str, value: &str) -> Option<bool> {
        let valid = match format {
            "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            "date-time" => DateTime::parse_from_rfc3339(value).is_ok(),
            "time" => is_time(value),
            "uuid" => uuid::Uuid::parse_str(value).is_ok(),
            "email" => value.to_string().validate_email(),
            "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
            "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
            _ => return None,
        };
        Some(valid)
    }

    /// Check a number against an integer width format
    pub fn check_number(&self, format: &str, value: &serde_json::Number) -> Option<bool> {
        let (min, max) = match format {
            "int32" => (i32::MIN as i64, i32::MAX as i64),
            "int64" => (i64::MIN, i64::MAX),
            _ => return None,
        };
        Some(value.as_i64().is_some_and(|n| n >= min && n <= max))
    }
}

/// RFC 3339 `full-time`, with the offset optional
fn is_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(&format!("1970-01-01T{}", value)).is_ok()
        || NaiveTime::parse_from_str(value, "%H:%M:%S%.f").is_ok()
}
