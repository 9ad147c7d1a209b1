use super::formats::{FormatChecker, FormatPolicy};
use super::{RuleKind, ValidationViolation, child_pointer};
use crate::contract::{InstanceType, PropertyPolicy, Schema, SchemaNode, SchemaRegistry};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt::Write;

/// Guards against schemas that only ever recurse into themselves (`allOf: [self]`)
const MAX_DEPTH: usize = 128;

/// Recursive validator for JSON values.
///
/// Collects every violation in one pass. A failed type check stops descent
/// into that value only; siblings are still visited.
pub struct InstanceValidator<'a> {
    registry: &'a SchemaRegistry,
    formats: &'a FormatChecker,
}

impl<'a> InstanceValidator<'a> {
    pub fn new(registry: &'a SchemaRegistry, formats: &'a FormatChecker) -> Self {
        Self { registry, formats }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Validate a whole value; pointers are relative to its root
    pub fn validate(&self, value: &Value, schema: &Schema) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        self.check(value, schema, "", 0, &mut violations);
        violations
    }

    /// True when `value` satisfies `schema`
    pub fn is_valid(&self, value: &Value, schema: &Schema) -> bool {
        self.validate(value, schema).is_empty()
    }

    fn check(
        &self,
        value: &Value,
        schema: &Schema,
        pointer: &str,
        depth: usize,
        out: &mut Vec<ValidationViolation>,
    ) {
        let Some(node) = self.registry.resolve(schema) else {
            out.push(ValidationViolation::new(
                RuleKind::UnresolvedRef,
                pointer,
                "schema reference cannot be resolved",
            ));
            return;
        };
        if depth > MAX_DEPTH {
            out.push(ValidationViolation::new(
                RuleKind::UnresolvedRef,
                pointer,
                "schema nesting is too deep",
            ));
            return;
        }

        if !node.types.is_empty() && !node.types.iter().any(|t| has_type(value, *t)) {
            out.push(ValidationViolation::new(
                RuleKind::Type,
                pointer,
                format!(
                    "expected {}, found {}",
                    node.types
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(" or "),
                    type_name(value)
                ),
            ));
            return;
        }

        if let Some(values) = &node.enum_values
            && !values.iter().any(|candidate| json_equal(candidate, value))
        {
            out.push(ValidationViolation::new(
                RuleKind::Enum,
                pointer,
                format!("{} is not one of {}", value, Value::Array(values.clone())),
            ));
        }

        if let Some(expected) = &node.const_value
            && !json_equal(expected, value)
        {
            out.push(ValidationViolation::new(
                RuleKind::Const,
                pointer,
                format!("expected constant {}", expected),
            ));
        }

        match value {
            Value::Object(map) => self.check_object(map, node, pointer, depth, out),
            Value::Array(items) => self.check_array(items, node, pointer, depth, out),
            Value::String(s) => self.check_string(s, node, pointer, out),
            Value::Number(n) => self.check_number(n, node, pointer, out),
            Value::Bool(_) | Value::Null => {}
        }

        self.check_composition(value, node, pointer, depth, out);
    }

    fn check_object(
        &self,
        map: &Map<String, Value>,
        node: &SchemaNode,
        pointer: &str,
        depth: usize,
        out: &mut Vec<ValidationViolation>,
    ) {
        for name in &node.required {
            if map.contains_key(name) {
                continue;
            }
            // Read-only members are server-assigned and never sent by clients
            let read_only = node
                .properties
                .get(name)
                .and_then(|schema| self.registry.resolve(schema))
                .is_some_and(|prop| prop.read_only);
            if !read_only {
                out.push(ValidationViolation::new(
                    RuleKind::Required,
                    child_pointer(pointer, name),
                    format!("required property '{}' is missing", name),
                ));
            }
        }

        for (key, member) in map {
            let member_pointer = child_pointer(pointer, key);
            match node.properties.get(key) {
                Some(schema) => self.check(member, schema, &member_pointer, depth + 1, out),
                None => match &node.additional_properties {
                    PropertyPolicy::Allowed => {}
                    PropertyPolicy::Forbidden => out.push(ValidationViolation::new(
                        RuleKind::AdditionalProperties,
                        member_pointer,
                        format!("property '{}' is not allowed", key),
                    )),
                    PropertyPolicy::Schema(schema) => {
                        self.check(member, schema, &member_pointer, depth + 1, out)
                    }
                },
            }
        }

        if let Some(min) = node.min_properties
            && map.len() < min
        {
            out.push(ValidationViolation::new(
                RuleKind::MinProperties,
                pointer,
                format!("expected at least {} properties, found {}", min, map.len()),
            ));
        }
        if let Some(max) = node.max_properties
            && map.len() > max
        {
            out.push(ValidationViolation::new(
                RuleKind::MaxProperties,
                pointer,
                format!("expected at most {} properties, found {}", max, map.len()),
            ));
        }
    }

    fn check_array(
        &self,
        items: &[Value],
        node: &SchemaNode,
        pointer: &str,
        depth: usize,
        out: &mut Vec<ValidationViolation>,
    ) {
        if let Some(min) = node.min_items
            && items.len() < min
        {
            out.push(ValidationViolation::new(
                RuleKind::MinItems,
                pointer,
                format!("expected at least {} items, found {}", min, items.len()),
            ));
        }
        if let Some(max) = node.max_items
            && items.len() > max
        {
            out.push(ValidationViolation::new(
                RuleKind::MaxItems,
                pointer,
                format!("expected at most {} items, found {}", max, items.len()),
            ));
        }

        if node.unique_items {
            if has_duplicate(items) {
                out.push(ValidationViolation::new(
                    RuleKind::UniqueItems,
                    pointer,
                    "array items are not unique",
                ));
            }
        }

        if let Some(schema) = &node.items {
            for (i, item) in items.iter().enumerate() {
                self.check(item, schema, &child_pointer(pointer, &i.to_string()), depth + 1, out);
            }
        }
    }

    fn check_string(
        &self,
        s: &str,
        node: &SchemaNode,
        pointer: &str,
        out: &mut Vec<ValidationViolation>,
    ) {
        let length = s.chars().count();
        if let Some(min) = node.min_length
            && length < min
        {
            out.push(ValidationViolation::new(
                RuleKind::MinLength,
                pointer,
                format!("expected at least {} characters, found {}", min, length),
            ));
        }
        if let Some(max) = node.max_length
            && length > max
        {
            out.push(ValidationViolation::new(
                RuleKind::MaxLength,
                pointer,
                format!("expected at most {} characters, found {}", max, length),
            ));
        }

        if let Some(pattern) = &node.pattern
            && !pattern.is_match(s)
        {
            out.push(ValidationViolation::new(
                RuleKind::Pattern,
                pointer,
                format!("'{}' does not match pattern '{}'", s, pattern.as_str()),
            ));
        }

        if let Some(format) = &node.format {
            let valid = self.formats.check_str(format, s);
            self.report_format(valid, format, s, pointer, out);
        }
    }

    fn check_number(
        &self,
        n: &Number,
        node: &SchemaNode,
        pointer: &str,
        out: &mut Vec<ValidationViolation>,
    ) {
        let Some(x) = n.as_f64() else {
            return;
        };

        if let Some(min) = node.minimum
            && x < min
        {
            out.push(ValidationViolation::new(
                RuleKind::Minimum,
                pointer,
                format!("{} is less than the minimum of {}", n, min),
            ));
        }
        if let Some(min) = node.exclusive_minimum
            && x <= min
        {
            out.push(ValidationViolation::new(
                RuleKind::Minimum,
                pointer,
                format!("{} must be greater than {}", n, min),
            ));
        }
        if let Some(max) = node.maximum
            && x > max
        {
            out.push(ValidationViolation::new(
                RuleKind::Maximum,
                pointer,
                format!("{} is greater than the maximum of {}", n, max),
            ));
        }
        if let Some(max) = node.exclusive_maximum
            && x >= max
        {
            out.push(ValidationViolation::new(
                RuleKind::Maximum,
                pointer,
                format!("{} must be less than {}", n, max),
            ));
        }

        if let Some(step) = node.multiple_of
            && step > 0.0
        {
            let quotient = x / step;
            if (quotient - quotient.round()).abs() > 1e-9 {
                out.push(ValidationViolation::new(
                    RuleKind::MultipleOf,
                    pointer,
                    format!("{} is not a multiple of {}", n, step),
                ));
            }
        }

        if let Some(format) = &node.format {
            let valid = self.formats.check_number(format, n);
            self.report_format(valid, format, &n.to_string(), pointer, out);
        }
    }

    fn check_composition(
        &self,
        value: &Value,
        node: &SchemaNode,
        pointer: &str,
        depth: usize,
        out: &mut Vec<ValidationViolation>,
    ) {
        for schema in &node.all_of {
            self.check(value, schema, pointer, depth + 1, out);
        }

        if !node.any_of.is_empty() {
            let matched = node
                .any_of
                .iter()
                .any(|schema| self.subschema_passes(value, schema, depth));
            if !matched {
                out.push(ValidationViolation::new(
                    RuleKind::AnyOf,
                    pointer,
                    format!("value does not match any of {} schemas", node.any_of.len()),
                ));
            }
        }

        if !node.one_of.is_empty() {
            let matched = node
                .one_of
                .iter()
                .filter(|schema| self.subschema_passes(value, schema, depth))
                .count();
            if matched != 1 {
                out.push(ValidationViolation::new(
                    RuleKind::OneOf,
                    pointer,
                    format!(
                        "value must match exactly one of {} schemas, matched {}",
                        node.one_of.len(),
                        matched
                    ),
                ));
            }
        }
    }

    fn subschema_passes(&self, value: &Value, schema: &Schema, depth: usize) -> bool {
        let mut scratch = vec![];
        self.check(value, schema, "", depth + 1, &mut scratch);
        scratch.is_empty()
    }

    fn report_format(
        &self,
        valid: Option<bool>,
        format: &str,
        raw: &str,
        pointer: &str,
        out: &mut Vec<ValidationViolation>,
    ) {
        if valid != Some(false) {
            return;
        }
        match self.formats.policy(format) {
            FormatPolicy::Enforce => out.push(ValidationViolation::new(
                RuleKind::Format,
                pointer,
                format!("'{}' is not a valid {}", raw, format),
            )),
            FormatPolicy::Warn => {
                tracing::warn!("Value at '{}' is not a valid {}: {}", pointer, format, raw);
            }
            FormatPolicy::Ignore => {}
        }
    }
}

fn has_type(value: &Value, expected: InstanceType) -> bool {
    match (expected, value) {
        (InstanceType::Object, Value::Object(_)) => true,
        (InstanceType::Array, Value::Array(_)) => true,
        (InstanceType::String, Value::String(_)) => true,
        (InstanceType::Number, Value::Number(_)) => true,
        (InstanceType::Integer, Value::Number(n)) => is_integer(n),
        (InstanceType::Boolean, Value::Bool(_)) => true,
        (InstanceType::Null, Value::Null) => true,
        _ => false,
    }
}

fn is_integer(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(n) if is_integer(n) => "integer",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// JSON equality where `1` and `1.0` are the same number
/// Items are bucketed by `canonical_key`, so only equal-keyed items are compared
fn has_duplicate(items: &[Value]) -> bool {
    let mut seen: HashMap<String, Vec<&Value>> = HashMap::with_capacity(items.len());
    items.iter().any(|item| {
        let mut key = String::new();
        canonical_key(item, &mut key);
        let bucket = seen.entry(key).or_default();
        if bucket.iter().any(|other| json_equal(other, item)) {
            return true;
        }
        bucket.push(item);
        false
    })
}

/// Key that is equal for values `json_equal` treats as equal:
/// numbers go through `f64`, object keys are sorted
fn canonical_key(value: &Value, out: &mut String) {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => out.push('0'),
            Some(f) => {
                let _ = write!(out, "{}", f);
            }
            None => {
                let _ = write!(out, "{}", n);
            }
        },
        Value::Array(items) => {
            out.push('[');
            for item in items {
                canonical_key(item, out);
                out.push(',');
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (name, item) in entries {
                let _ = write!(out, "{:?}:", name);
                canonical_key(item, out);
                out.push(',');
            }
            out.push('}');
        }
        other => {
            let _ = write!(out, "{}", other);
        }
    }
}

fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}
