use crate::error::{GuardError, Result};
use crate::routing::RouteOptions;
use crate::validation::{FormatChecker, FormatPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Validator settings, read from `validator.yml` and then the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// When false, requests are forwarded without validation
    pub enabled: bool,
    /// Log every failed validation at warn level
    pub log_error: bool,
    pub skip_body_validation: bool,
    pub ignore_trailing_slash: bool,
    pub max_body_bytes: usize,
    pub default_format_policy: FormatPolicy,
    /// Per-format overrides, e.g. `date-time: warn`
    pub formats: HashMap<String, FormatPolicy>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_error: true,
            skip_body_validation: false,
            ignore_trailing_slash: false,
            max_body_bytes: 1024 * 1024,
            default_format_policy: FormatPolicy::Enforce,
            formats: HashMap::new(),
        }
    }
}

impl ValidatorConfig {
    /// Load from an optional YAML file, then apply `GUARD_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file means all defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| GuardError::ConfigError(e.to_string()))
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_bool(&lookup, "GUARD_ENABLED", &mut self.enabled)?;
        override_bool(&lookup, "GUARD_LOG_ERROR", &mut self.log_error)?;
        override_bool(&lookup, "GUARD_SKIP_BODY_VALIDATION", &mut self.skip_body_validation)?;
        override_bool(&lookup, "GUARD_IGNORE_TRAILING_SLASH", &mut self.ignore_trailing_slash)?;

        if let Some(raw) = lookup("GUARD_MAX_BODY_BYTES") {
            self.max_body_bytes = raw.trim().parse().map_err(|_| {
                GuardError::ConfigError(format!("GUARD_MAX_BODY_BYTES must be a number, got '{}'", raw))
            })?;
        }

        Ok(self)
    }

    pub fn route_options(&self) -> RouteOptions {
        RouteOptions {
            ignore_trailing_slash: self.ignore_trailing_slash,
        }
    }

    pub fn format_checker(&self) -> FormatChecker {
        FormatChecker::new(self.default_format_policy, self.formats.clone())
    }
}

fn override_bool<F>(lookup: &F, key: &str, target: &mut bool) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    *target = match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => {
            return Err(GuardError::ConfigError(format!(
                "{} must be true or false, got '{}'",
                key, raw
            )));
        }
    };
    Ok(())
}
