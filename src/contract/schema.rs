use crate::error::{GuardError, Result};
use crate::models::openapi::{AdditionalProperties, ExclusiveBound, SchemaObject, TypeSet};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Alias chains longer than this are treated as cycles
const MAX_REF_DEPTH: usize = 32;

/// JSON type names usable in `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl InstanceType {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "object" => Ok(InstanceType::Object),
            "array" => Ok(InstanceType::Array),
            "string" => Ok(InstanceType::String),
            "number" => Ok(InstanceType::Number),
            "integer" => Ok(InstanceType::Integer),
            "boolean" => Ok(InstanceType::Boolean),
            "null" => Ok(InstanceType::Null),
            other => Err(GuardError::ContractError(format!(
                "unknown schema type '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::Object => "object",
            InstanceType::Array => "array",
            InstanceType::String => "string",
            InstanceType::Number => "number",
            InstanceType::Integer => "integer",
            InstanceType::Boolean => "boolean",
            InstanceType::Null => "null",
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled schema: either inline or a reference to a named component
#[derive(Debug, Clone)]
pub enum Schema {
    Ref(String),
    Node(Box<SchemaNode>),
}

/// What to do with object members not listed in `properties`
#[derive(Debug, Clone, Default)]
pub enum PropertyPolicy {
    #[default]
    Allowed,
    Forbidden,
    Schema(Schema),
}

#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    /// Accepted types; empty accepts any
    pub types: Vec<InstanceType>,
    pub format: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,

    pub required: Vec<String>,
    pub properties: IndexMap<String, Schema>,
    pub additional_properties: PropertyPolicy,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,

    pub items: Option<Schema>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,

    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,

    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,

    pub all_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub one_of: Vec<Schema>,

    pub read_only: bool,
}

impl SchemaNode {
    /// Primary declared type, ignoring `null`
    pub fn primary_type(&self) -> Option<InstanceType> {
        self.types
            .iter()
            .copied()
            .find(|t| *t != InstanceType::Null)
    }
}

impl Schema {
    /// Compile a schema object, recording every component name it references
    pub fn compile(object: &SchemaObject, refs: &mut Vec<String>) -> Result<Self> {
        if let Some(reference) = &object.reference {
            let name = reference
                .strip_prefix(COMPONENT_SCHEMA_PREFIX)
                .filter(|name| !name.is_empty() && !name.contains('/'))
                .ok_or_else(|| GuardError::UnresolvedRef(reference.clone()))?;
            refs.push(name.to_string());
            return Ok(Schema::Ref(name.to_string()));
        }

        let mut types = match &object.schema_type {
            None => vec![],
            Some(TypeSet::Single(name)) => vec![InstanceType::parse(name)?],
            Some(TypeSet::Multiple(names)) => names
                .iter()
                .map(|n| InstanceType::parse(n))
                .collect::<Result<Vec<_>>>()?,
        };
        if object.nullable == Some(true) && !types.is_empty() && !types.contains(&InstanceType::Null)
        {
            types.push(InstanceType::Null);
        }

        let (minimum, exclusive_minimum) = split_bound(object.minimum, object.exclusive_minimum);
        let (maximum, exclusive_maximum) = split_bound(object.maximum, object.exclusive_maximum);

        let properties = object
            .properties
            .iter()
            .map(|(name, prop)| -> Result<(String, Schema)> {
                Ok((name.clone(), Schema::compile(prop, refs)?))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        let additional_properties = match &object.additional_properties {
            None | Some(AdditionalProperties::Allowed(true)) => PropertyPolicy::Allowed,
            Some(AdditionalProperties::Allowed(false)) => PropertyPolicy::Forbidden,
            Some(AdditionalProperties::Schema(schema)) => {
                PropertyPolicy::Schema(Schema::compile(schema, refs)?)
            }
        };

        let items = object
            .items
            .as_deref()
            .map(|items| Schema::compile(items, refs))
            .transpose()?;

        let pattern = object.pattern.as_deref().map(Regex::new).transpose()?;

        let mut compile_all = |schemas: &[SchemaObject]| {
            schemas
                .iter()
                .map(|s| Schema::compile(s, refs))
                .collect::<Result<Vec<_>>>()
        };
        let all_of = compile_all(&object.all_of)?;
        let any_of = compile_all(&object.any_of)?;
        let one_of = compile_all(&object.one_of)?;

        Ok(Schema::Node(Box::new(SchemaNode {
            types,
            format: object.format.clone(),
            enum_values: object.enum_values.clone(),
            const_value: object.const_value.clone(),
            required: object.required.clone(),
            properties,
            additional_properties,
            min_properties: object.min_properties,
            max_properties: object.max_properties,
            items,
            min_items: object.min_items,
            max_items: object.max_items,
            unique_items: object.unique_items.unwrap_or(false),
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            multiple_of: object.multiple_of,
            min_length: object.min_length,
            max_length: object.max_length,
            pattern,
            all_of,
            any_of,
            one_of,
            read_only: object.read_only,
        })))
    }
}

/// Normalise 3.0 (`minimum` + boolean flag) and 3.1 (numeric) exclusive bounds
fn split_bound(inclusive: Option<f64>, exclusive: Option<ExclusiveBound>) -> (Option<f64>, Option<f64>) {
    match exclusive {
        Some(ExclusiveBound::Flag(true)) => (None, inclusive),
        Some(ExclusiveBound::Value(bound)) => (inclusive, Some(bound)),
        Some(ExclusiveBound::Flag(false)) | None => (inclusive, None),
    }
}

/// Named component schemas, the targets of `Schema::Ref`
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Follow references until an inline node is reached.
    /// Returns `None` for dangling references and alias cycles.
    pub fn resolve<'a>(&'a self, schema: &'a Schema) -> Option<&'a SchemaNode> {
        let mut current = schema;
        for _ in 0..MAX_REF_DEPTH {
            match current {
                Schema::Node(node) => return Some(node),
                Schema::Ref(name) => current = self.schemas.get(name)?,
            }
        }
        None
    }

    /// Check that every referenced name exists and resolves to a node
    pub fn check_refs<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Result<()> {
        for name in names {
            let schema = Schema::Ref(name.clone());
            if self.resolve(&schema).is_none() {
                return Err(GuardError::UnresolvedRef(format!(
                    "{}{}",
                    COMPONENT_SCHEMA_PREFIX, name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(yaml: &str) -> (Schema, Vec<String>) {
        let object: SchemaObject = serde_yaml::from_str(yaml).unwrap();
        let mut refs = vec![];
        let schema = Schema::compile(&object, &mut refs).unwrap();
        (schema, refs)
    }

    #[test]
    fn test_compile_nullable_adds_null_type() {
        let (schema, _) = compile("type: string\nnullable: true\n");
        let registry = SchemaRegistry::new();
        let node = registry.resolve(&schema).unwrap();
        assert_eq!(node.types, vec![InstanceType::String, InstanceType::Null]);
        assert_eq!(node.primary_type(), Some(InstanceType::String));
    }

    #[test]
    fn test_compile_exclusive_bounds() {
        let (schema, _) = compile("type: integer\nminimum: 1\nexclusiveMinimum: true\nmaximum: 10\n");
        let registry = SchemaRegistry::new();
        let node = registry.resolve(&schema).unwrap();
        assert_eq!(node.minimum, None);
        assert_eq!(node.exclusive_minimum, Some(1.0));
        assert_eq!(node.maximum, Some(10.0));

        let (schema, _) = compile("type: number\nexclusiveMaximum: 5.5\n");
        let node = registry.resolve(&schema).unwrap();
        assert_eq!(node.exclusive_maximum, Some(5.5));
    }

    #[test]
    fn test_compile_collects_refs() {
        let (_, refs) = compile(
            r#"
type: object
properties:
  category:
    $ref: '#/components/schemas/Category'
  tags:
    type: array
    items:
      $ref: '#/components/schemas/Tag'
"#,
        );
        assert_eq!(refs, vec!["Category".to_string(), "Tag".to_string()]);
    }

    #[test]
    fn test_compile_rejects_external_ref() {
        let object: SchemaObject =
            serde_yaml::from_str("$ref: 'other.yaml#/components/schemas/Pet'").unwrap();
        let result = Schema::compile(&object, &mut vec![]);
        assert!(matches!(result, Err(GuardError::UnresolvedRef(_))));
    }

    #[test]
    fn test_compile_rejects_bad_pattern() {
        let object: SchemaObject = serde_yaml::from_str("type: string\npattern: '[a-'").unwrap();
        assert!(Schema::compile(&object, &mut vec![]).is_err());
    }

    #[test]
    fn test_resolve_alias_chain_and_cycle() {
        let mut registry = SchemaRegistry::new();
        registry.insert("A", Schema::Ref("B".to_string()));
        registry.insert("B", Schema::Node(Box::default()));
        assert!(registry.resolve(&Schema::Ref("A".to_string())).is_some());
        assert!(registry.check_refs(&["A".to_string()]).is_ok());

        registry.insert("Loop", Schema::Ref("Loop".to_string()));
        assert!(registry.resolve(&Schema::Ref("Loop".to_string())).is_none());
        assert!(registry.check_refs(&["Missing".to_string()]).is_err());
    }
}
