use super::schema::{Schema, SchemaRegistry};
use super::template::PathTemplate;
use super::{HttpMethod, Location};
use crate::error::Result;
use crate::routing::RouteIndex;
use std::sync::Arc;

/// A declared path, query or header parameter
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub location: Location,
    pub required: bool,
    /// Declared schema; `None` accepts any string
    pub schema: Option<Schema>,
    /// Repeated keys (`true`) or comma separated values for query arrays
    pub explode: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            // Path parameters are always required
            required: location == Location::Path,
            location,
            schema: None,
            explode: true,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == Location::Path;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_explode(mut self, explode: bool) -> Self {
        self.explode = explode;
        self
    }
}

/// Request body declaration of an operation
#[derive(Debug, Clone, Default)]
pub struct BodySpec {
    pub required: bool,
    /// Media type the schema was taken from
    pub media_type: Option<String>,
    /// JSON schema of the body; `None` when no JSON media type is declared
    pub schema: Option<Schema>,
}

/// One (method, path template) entry of the contract
#[derive(Debug, Clone)]
pub struct OperationTemplate {
    pub method: HttpMethod,
    pub template: PathTemplate,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParameterSpec>,
    pub body: Option<BodySpec>,
}

impl OperationTemplate {
    pub fn new(method: HttpMethod, template: PathTemplate) -> Self {
        Self {
            method,
            template,
            operation_id: None,
            parameters: vec![],
            body: None,
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_body(mut self, body: BodySpec) -> Self {
        self.body = Some(body);
        self
    }

    /// Label used in logs: operationId or `METHOD /template`
    pub fn label(&self) -> String {
        match &self.operation_id {
            Some(id) => id.clone(),
            None => format!("{} {}", self.method, self.template),
        }
    }
}

/// Immutable, compiled contract shared by every request
#[derive(Debug)]
pub struct SchemaModel {
    title: String,
    version: String,
    base_path: String,
    operations: Vec<Arc<OperationTemplate>>,
    schemas: SchemaRegistry,
    routes: RouteIndex,
}

impl SchemaModel {
    /// Assemble a model from already compiled parts.
    /// Fails when two operations share a method and an indistinguishable template.
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        base_path: impl Into<String>,
        operations: Vec<OperationTemplate>,
        schemas: SchemaRegistry,
    ) -> Result<Self> {
        let operations: Vec<Arc<OperationTemplate>> = operations.into_iter().map(Arc::new).collect();
        let routes = RouteIndex::build(&operations)?;

        Ok(Self {
            title: title.into(),
            version: version.into(),
            base_path: base_path.into(),
            operations,
            schemas,
            routes,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Path prefix taken from the contract's first server URL
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn operations(&self) -> &[Arc<OperationTemplate>] {
        &self.operations
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn routes(&self) -> &RouteIndex {
        &self.routes
    }

    /// Find an operation by its identity
    pub fn operation(&self, method: HttpMethod, template: &str) -> Option<&Arc<OperationTemplate>> {
        self.operations
            .iter()
            .find(|op| op.method == method && op.template.as_str() == template)
    }

    pub fn find_operation_by_id(&self, operation_id: &str) -> Option<&Arc<OperationTemplate>> {
        self.operations
            .iter()
            .find(|op| op.operation_id.as_deref() == Some(operation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(method: HttpMethod, template: &str) -> OperationTemplate {
        OperationTemplate::new(method, PathTemplate::parse(template).unwrap())
    }

    #[test]
    fn test_path_parameters_are_always_required() {
        let param = ParameterSpec::new("petId", Location::Path).required(false);
        assert!(param.required);

        let param = ParameterSpec::new("limit", Location::Query);
        assert!(!param.required);
    }

    #[test]
    fn test_model_lookup() {
        let model = SchemaModel::new(
            "Petstore",
            "1.0.0",
            "/v2",
            vec![
                op(HttpMethod::Post, "/v2/pet").with_operation_id("addPet"),
                op(HttpMethod::Get, "/v2/pet/{petId}").with_operation_id("getPetById"),
            ],
            SchemaRegistry::new(),
        )
        .unwrap();

        assert_eq!(model.operations().len(), 2);
        assert!(model.operation(HttpMethod::Post, "/v2/pet").is_some());
        assert!(model.operation(HttpMethod::Get, "/v2/pet").is_none());
        assert_eq!(
            model.find_operation_by_id("getPetById").unwrap().template.as_str(),
            "/v2/pet/{petId}"
        );
    }

    #[test]
    fn test_model_rejects_ambiguous_templates() {
        let result = SchemaModel::new(
            "Petstore",
            "1.0.0",
            "",
            vec![op(HttpMethod::Get, "/pet/{id}"), op(HttpMethod::Get, "/pet/{petId}")],
            SchemaRegistry::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_label_falls_back_to_identity() {
        assert_eq!(op(HttpMethod::Delete, "/pet/{id}").label(), "DELETE /pet/{id}");
    }
}
