use super::{InstanceValidator, RuleKind, ValidationViolation};
use crate::contract::{InstanceType, Location, ParameterSpec, SchemaNode};
use http::HeaderMap;
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashMap};

/// Query string decoded into name → values, keeping repeated keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `a=1&a=2&b=x`; a leading `?` is ignored
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
        params
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// All values for a key, in request order
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Raw parameter text pulled from its location
enum RawValue<'r> {
    Absent,
    Values(Vec<&'r str>),
    /// Header bytes that are not visible ASCII
    Opaque,
}

/// Validates path, query and header parameters against their declarations
pub struct ParameterValidator<'a> {
    instances: &'a InstanceValidator<'a>,
}

impl<'a> ParameterValidator<'a> {
    pub fn new(instances: &'a InstanceValidator<'a>) -> Self {
        Self { instances }
    }

    pub fn validate(
        &self,
        path_params: &BTreeMap<String, String>,
        headers: &HeaderMap,
        query: &QueryParams,
        specs: &[ParameterSpec],
    ) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for spec in specs {
            let raw = match spec.location {
                Location::Path => match path_params.get(&spec.name) {
                    Some(value) => RawValue::Values(vec![value.as_str()]),
                    None => RawValue::Absent,
                },
                Location::Query => match query.get_all(&spec.name) {
                    [] => RawValue::Absent,
                    values => RawValue::Values(values.iter().map(String::as_str).collect()),
                },
                Location::Header => header_values(headers, &spec.name),
                Location::Body => continue,
            };

            match raw {
                RawValue::Absent if spec.required => violations.push(
                    ValidationViolation::new(
                        RuleKind::MissingParameter,
                        spec.name.as_str(),
                        format!("required {} parameter '{}' is missing", spec.location, spec.name),
                    )
                    .with_location(spec.location),
                ),
                RawValue::Absent => {}
                RawValue::Opaque => violations.push(
                    ValidationViolation::new(
                        RuleKind::ParameterType,
                        spec.name.as_str(),
                        format!("header '{}' is not valid text", spec.name),
                    )
                    .with_location(spec.location),
                ),
                RawValue::Values(values) => self.check_value(spec, &values, &mut violations),
            }
        }

        violations
    }

    fn check_value(&self, spec: &ParameterSpec, values: &[&str], out: &mut Vec<ValidationViolation>) {
        let Some(schema) = &spec.schema else {
            return;
        };
        let Some(node) = self.instances.registry().resolve(schema) else {
            out.push(
                ValidationViolation::new(
                    RuleKind::UnresolvedRef,
                    spec.name.as_str(),
                    format!("schema of parameter '{}' cannot be resolved", spec.name),
                )
                .with_location(spec.location),
            );
            return;
        };

        let coerced = match self.coerce(spec, node, values) {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(message) => {
                out.push(
                    ValidationViolation::new(RuleKind::ParameterType, spec.name.as_str(), message)
                        .with_location(spec.location),
                );
                return;
            }
        };

        for violation in self.instances.validate(&coerced, schema) {
            let rule = match violation.rule {
                RuleKind::Type => RuleKind::ParameterType,
                other => other,
            };
            out.push(ValidationViolation {
                location: spec.location,
                pointer: format!("{}{}", spec.name, violation.pointer),
                message: format!("parameter '{}': {}", spec.name, violation.message),
                rule,
            });
        }
    }

    /// Turn raw strings into a JSON value of the declared type.
    /// `Ok(None)` means the declared type is not checked for parameters.
    fn coerce(
        &self,
        spec: &ParameterSpec,
        node: &SchemaNode,
        values: &[&str],
    ) -> Result<Option<Value>, String> {
        match node.primary_type() {
            Some(InstanceType::Array) => {
                let item_type = node
                    .items
                    .as_ref()
                    .and_then(|items| self.instances.registry().resolve(items))
                    .and_then(SchemaNode::primary_type);
                // Repeated keys, or one comma separated value
                let split = !spec.explode || spec.location != Location::Query || values.len() == 1;
                let parts: Vec<&str> = if split {
                    values.iter().flat_map(|v| v.split(',')).collect()
                } else {
                    values.to_vec()
                };
                parts
                    .into_iter()
                    .map(|part| coerce_scalar(&spec.name, item_type, part))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|items| Some(Value::Array(items)))
            }
            Some(InstanceType::Object) => {
                tracing::debug!("Skipping object-typed parameter '{}'", spec.name);
                Ok(None)
            }
            scalar => {
                // Repeated keys for a scalar: the first one counts
                let first = values.first().copied().unwrap_or_default();
                coerce_scalar(&spec.name, scalar, first).map(Some)
            }
        }
    }
}

fn header_values<'h>(headers: &'h HeaderMap, name: &str) -> RawValue<'h> {
    let mut values = vec![];
    for value in headers.get_all(name) {
        match value.to_str() {
            Ok(text) => values.push(text),
            Err(_) => return RawValue::Opaque,
        }
    }
    if values.is_empty() {
        RawValue::Absent
    } else {
        RawValue::Values(values)
    }
}

fn coerce_scalar(name: &str, expected: Option<InstanceType>, raw: &str) -> Result<Value, String> {
    let mismatch = |type_name: &str| {
        format!("parameter '{}' expected {}, got '{}'", name, type_name, raw)
    };
    match expected {
        Some(InstanceType::Integer) => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| mismatch("integer")),
        Some(InstanceType::Number) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch("number")),
        Some(InstanceType::Boolean) => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch("boolean")),
        },
        Some(InstanceType::Null) if raw.is_empty() || raw == "null" => Ok(Value::Null),
        Some(InstanceType::Null) => Err(mismatch("null")),
        Some(InstanceType::String) | Some(InstanceType::Array) | Some(InstanceType::Object) | None => {
            Ok(Value::String(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Schema, SchemaRegistry};
    use crate::models::openapi::SchemaObject;
    use crate::validation::FormatChecker;
    use http::{HeaderName, HeaderValue};

    fn schema(yaml: &str) -> Schema {
        let object: SchemaObject = serde_yaml::from_str(yaml).unwrap();
        Schema::compile(&object, &mut vec![]).unwrap()
    }

    fn run(
        path_params: &BTreeMap<String, String>,
        headers: &HeaderMap,
        query: &QueryParams,
        specs: &[ParameterSpec],
    ) -> Vec<ValidationViolation> {
        let registry = SchemaRegistry::new();
        let formats = FormatChecker::default();
        let instances = InstanceValidator::new(&registry, &formats);
        ParameterValidator::new(&instances).validate(path_params, headers, query, specs)
    }

    fn api_key() -> ParameterSpec {
        ParameterSpec::new("api_key", Location::Header)
            .required(true)
            .with_schema(schema("type: string\n"))
    }

    #[test]
    fn test_query_string_decoding() {
        let query = QueryParams::from_query_string("?status=sold&status=available&name=a%20b&tag=x+y");
        assert_eq!(query.get_all("status"), ["sold", "available"]);
        assert_eq!(query.get_all("name"), ["a b"]);
        assert_eq!(query.get_all("tag"), ["x y"]);
        assert!(query.get_all("missing").is_empty());
    }

    #[test]
    fn test_missing_required_header() {
        let violations = run(&BTreeMap::new(), &HeaderMap::new(), &QueryParams::new(), &[api_key()]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, RuleKind::MissingParameter);
        assert_eq!(violations[0].location, Location::Header);
        assert_eq!(violations[0].pointer, "api_key");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"API_KEY").unwrap(),
            HeaderValue::from_static("special-key"),
        );
        assert!(run(&BTreeMap::new(), &headers, &QueryParams::new(), &[api_key()]).is_empty());

        let shouted = ParameterSpec::new("Api_Key", Location::Header).required(true);
        assert!(run(&BTreeMap::new(), &headers, &QueryParams::new(), &[shouted]).is_empty());
    }

    #[test]
    fn test_query_lookup_is_case_sensitive() {
        let spec = ParameterSpec::new("status", Location::Query).required(true);
        let query = QueryParams::from_query_string("Status=sold");
        let violations = run(&BTreeMap::new(), &HeaderMap::new(), &query, &[spec]);
        assert_eq!(violations[0].rule, RuleKind::MissingParameter);
    }

    #[test]
    fn test_path_parameter_type() {
        let spec = ParameterSpec::new("petId", Location::Path)
            .with_schema(schema("type: integer\nformat: int64\n"));

        let mut params = BTreeMap::new();
        params.insert("petId".to_string(), "111".to_string());
        assert!(run(&params, &HeaderMap::new(), &QueryParams::new(), &[spec.clone()]).is_empty());

        params.insert("petId".to_string(), "abc".to_string());
        let violations = run(&params, &HeaderMap::new(), &QueryParams::new(), &[spec]);
        assert_eq!(violations[0].rule, RuleKind::ParameterType);
        assert_eq!(violations[0].location, Location::Path);
    }

    #[test]
    fn test_coerced_value_checked_against_schema() {
        let spec = ParameterSpec::new("limit", Location::Query)
            .with_schema(schema("type: integer\nminimum: 1\nmaximum: 50\n"));
        let query = QueryParams::from_query_string("limit=500");
        let violations = run(&BTreeMap::new(), &HeaderMap::new(), &query, &[spec]);
        assert_eq!(violations[0].rule, RuleKind::Maximum);
        assert_eq!(violations[0].location, Location::Query);
        assert_eq!(violations[0].pointer, "limit");
    }

    #[test]
    fn test_array_parameters() {
        let spec = ParameterSpec::new("status", Location::Query).with_schema(schema(
            "type: array\nitems:\n  type: string\n  enum: [available, pending, sold]\n",
        ));

        let repeated = QueryParams::from_query_string("status=sold&status=pending");
        assert!(run(&BTreeMap::new(), &HeaderMap::new(), &repeated, &[spec.clone()]).is_empty());

        let comma = QueryParams::from_query_string("status=sold,pending");
        assert!(run(&BTreeMap::new(), &HeaderMap::new(), &comma, &[spec.clone()]).is_empty());

        let bad = QueryParams::from_query_string("status=sold&status=lost");
        let violations = run(&BTreeMap::new(), &HeaderMap::new(), &bad, &[spec]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, RuleKind::Enum);
        assert_eq!(violations[0].pointer, "status/1");
    }

    #[test]
    fn test_integer_array_coercion_failure() {
        let spec = ParameterSpec::new("ids", Location::Query)
            .with_explode(false)
            .with_schema(schema("type: array\nitems:\n  type: integer\n"));
        let query = QueryParams::from_query_string("ids=1,2,x");
        let violations = run(&BTreeMap::new(), &HeaderMap::new(), &query, &[spec]);
        assert_eq!(violations[0].rule, RuleKind::ParameterType);
    }

    #[test]
    fn test_boolean_and_number() {
        let flag = ParameterSpec::new("dry", Location::Query).with_schema(schema("type: boolean\n"));
        let ratio = ParameterSpec::new("ratio", Location::Query).with_schema(schema("type: number\n"));
        let specs = [flag, ratio];

        let good = QueryParams::from_query_string("dry=true&ratio=0.5");
        assert!(run(&BTreeMap::new(), &HeaderMap::new(), &good, &specs).is_empty());

        let bad = QueryParams::from_query_string("dry=yes&ratio=NaN");
        let violations = run(&BTreeMap::new(), &HeaderMap::new(), &bad, &specs);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.rule == RuleKind::ParameterType));
    }

    #[test]
    fn test_optional_absent_parameter_passes() {
        let spec = ParameterSpec::new("limit", Location::Query).with_schema(schema("type: integer\n"));
        assert!(run(&BTreeMap::new(), &HeaderMap::new(), &QueryParams::new(), &[spec]).is_empty());
    }
}
