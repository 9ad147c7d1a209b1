use super::model::{BodySpec, OperationTemplate, ParameterSpec, SchemaModel};
use super::schema::{Schema, SchemaRegistry};
use super::template::PathTemplate;
use super::{HttpMethod, Location};
use crate::error::{GuardError, Result};
use crate::models::openapi::{
    Components, MediaType, OpenApiDocument, Parameter, ParameterIn, ReferenceOr, RequestBody,
};
use indexmap::IndexMap;

const COMPONENT_PARAMETER_PREFIX: &str = "#/components/parameters/";
const COMPONENT_BODY_PREFIX: &str = "#/components/requestBodies/";

impl SchemaModel {
    /// Compile a parsed OpenAPI document into the validation model
    pub fn from_document(doc: &OpenApiDocument) -> Result<Self> {
        let empty = Components::default();
        let components = doc.components.as_ref().unwrap_or(&empty);
        let mut refs = Vec::new();

        let mut registry = SchemaRegistry::new();
        for (name, object) in &components.schemas {
            registry.insert(name.clone(), Schema::compile(object, &mut refs)?);
        }

        let base_path = doc
            .servers
            .first()
            .map(|server| base_path_of(&server.url))
            .unwrap_or_default();

        let mut operations = Vec::new();
        for (path, item) in &doc.paths {
            let template = PathTemplate::parse(&join_path(&base_path, path))?;

            for (method, operation) in item.operations() {
                let method: HttpMethod = method.parse().map_err(GuardError::ContractError)?;

                let parameters = merge_parameters(&item.parameters, &operation.parameters, components)?
                    .into_iter()
                    .filter_map(|param| compile_parameter(param, &template, &mut refs).transpose())
                    .collect::<Result<Vec<_>>>()?;

                let body = operation
                    .request_body
                    .as_ref()
                    .map(|body| compile_body(resolve_body(body, components)?, &mut refs))
                    .transpose()?;

                let mut compiled = OperationTemplate::new(method, template.clone());
                compiled.operation_id = operation.operation_id.clone();
                compiled.parameters = parameters;
                compiled.body = body;

                tracing::debug!(
                    "Compiled operation {} ({} parameters, body: {})",
                    compiled.label(),
                    compiled.parameters.len(),
                    compiled.body.is_some()
                );
                operations.push(compiled);
            }
        }

        registry.check_refs(&refs)?;

        tracing::info!(
            "Loaded contract '{}' {}: {} operations, {} schemas",
            doc.info.title,
            doc.info.version,
            operations.len(),
            registry.len()
        );

        SchemaModel::new(
            doc.info.title.clone(),
            doc.info.version.clone(),
            base_path,
            operations,
            registry,
        )
    }
}

/// Path component of a server URL, without a trailing slash.
/// Handles absolute URLs, relative paths and URLs with `{variables}`.
fn base_path_of(server_url: &str) -> String {
    let path = match url::Url::parse(server_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => match server_url.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|i| rest[i..].to_string()).unwrap_or_default(),
            None if server_url.starts_with('/') => server_url.to_string(),
            None => String::new(),
        },
    };
    path.trim_end_matches('/').to_string()
}

fn join_path(base_path: &str, path: &str) -> String {
    if path == "/" && !base_path.is_empty() {
        base_path.to_string()
    } else {
        format!("{}{}", base_path, path)
    }
}

/// Operation-level parameters override path-level ones with the same name and location
fn merge_parameters<'a>(
    shared: &'a [ReferenceOr<Parameter>],
    own: &'a [ReferenceOr<Parameter>],
    components: &'a Components,
) -> Result<Vec<&'a Parameter>> {
    let mut merged: IndexMap<(String, ParameterIn), &Parameter> = IndexMap::new();
    for param in shared.iter().chain(own) {
        let param = resolve_parameter(param, components)?;
        merged.insert((param.name.clone(), param.location), param);
    }
    Ok(merged.into_values().collect())
}

fn resolve_parameter<'a>(
    param: &'a ReferenceOr<Parameter>,
    components: &'a Components,
) -> Result<&'a Parameter> {
    match param {
        ReferenceOr::Item(param) => Ok(param),
        ReferenceOr::Reference { reference } => reference
            .strip_prefix(COMPONENT_PARAMETER_PREFIX)
            .and_then(|name| components.parameters.get(name))
            .ok_or_else(|| GuardError::UnresolvedRef(reference.clone())),
    }
}

fn resolve_body<'a>(
    body: &'a ReferenceOr<RequestBody>,
    components: &'a Components,
) -> Result<&'a RequestBody> {
    match body {
        ReferenceOr::Item(body) => Ok(body),
        ReferenceOr::Reference { reference } => reference
            .strip_prefix(COMPONENT_BODY_PREFIX)
            .and_then(|name| components.request_bodies.get(name))
            .ok_or_else(|| GuardError::UnresolvedRef(reference.clone())),
    }
}

fn compile_parameter(
    param: &Parameter,
    template: &PathTemplate,
    refs: &mut Vec<String>,
) -> Result<Option<ParameterSpec>> {
    let location = match param.location {
        ParameterIn::Path => Location::Path,
        ParameterIn::Query => Location::Query,
        ParameterIn::Header => Location::Header,
        ParameterIn::Cookie => {
            tracing::debug!("Cookie parameter '{}' is not validated", param.name);
            return Ok(None);
        }
    };

    if location == Location::Path && !template.param_names().any(|name| name == param.name) {
        tracing::warn!(
            "Path parameter '{}' is not part of template {}; ignoring it",
            param.name,
            template
        );
        return Ok(None);
    }

    let mut spec = ParameterSpec::new(&param.name, location)
        .required(param.required)
        .with_explode(param.explode.unwrap_or(param.style.as_deref().is_none_or(|s| s == "form")));
    if let Some(schema) = &param.schema {
        spec = spec.with_schema(Schema::compile(schema, refs)?);
    }
    Ok(Some(spec))
}

fn compile_body(body: &RequestBody, refs: &mut Vec<String>) -> Result<BodySpec> {
    let json = body
        .content
        .iter()
        .find(|(media_type, _)| is_json_media_type(media_type));

    let (media_type, schema) = match json {
        Some((media_type, MediaType { schema: Some(schema) })) => (
            Some(media_type.clone()),
            Some(Schema::compile(schema, refs)?),
        ),
        Some((media_type, _)) => (Some(media_type.clone()), None),
        None => (None, None),
    };

    Ok(BodySpec {
        required: body.required,
        media_type,
        schema,
    })
}

fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || essence.ends_with("+json")
        || essence == "*/*"
        || essence == "application/*"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(yaml: &str) -> Result<SchemaModel> {
        let doc: OpenApiDocument = serde_yaml::from_str(yaml).unwrap();
        SchemaModel::from_document(&doc)
    }

    const PETS: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
servers:
  - url: https://petstore.example.com/v2/
paths:
  /pet/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema:
          type: string
      - $ref: '#/components/parameters/Trace'
    get:
      operationId: getPetById
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            type: integer
    delete:
      operationId: deletePet
      parameters:
        - name: api_key
          in: header
          required: true
          schema:
            type: string
        - name: session
          in: cookie
  /pet:
    post:
      operationId: addPet
      requestBody:
        $ref: '#/components/requestBodies/Pet'
components:
  parameters:
    Trace:
      name: X-Trace
      in: header
      schema:
        type: string
  requestBodies:
    Pet:
      required: true
      content:
        application/xml:
          schema:
            $ref: '#/components/schemas/Pet'
        application/json; charset=utf-8:
          schema:
            $ref: '#/components/schemas/Pet'
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name:
          type: string
"#;

    #[test]
    fn test_base_path_prefixes_templates() {
        let model = build(PETS).unwrap();
        assert_eq!(model.base_path(), "/v2");
        assert!(model.operation(HttpMethod::Get, "/v2/pet/{petId}").is_some());
        assert!(model.operation(HttpMethod::Post, "/v2/pet").is_some());
    }

    #[test]
    fn test_operation_parameters_override_path_parameters() {
        let model = build(PETS).unwrap();
        let op = model.find_operation_by_id("getPetById").unwrap();

        let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["petId", "X-Trace"]);

        let pet_id = &op.parameters[0];
        let node = model.schemas().resolve(pet_id.schema.as_ref().unwrap()).unwrap();
        assert_eq!(node.primary_type().unwrap().as_str(), "integer");
    }

    #[test]
    fn test_cookie_parameters_are_skipped() {
        let model = build(PETS).unwrap();
        let op = model.find_operation_by_id("deletePet").unwrap();
        assert!(op.parameters.iter().all(|p| p.name != "session"));
        assert!(op.parameters.iter().any(|p| p.name == "api_key" && p.required));
    }

    #[test]
    fn test_request_body_reference_uses_json_media_type() {
        let model = build(PETS).unwrap();
        let body = model.find_operation_by_id("addPet").unwrap().body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.media_type.as_deref(), Some("application/json; charset=utf-8"));
        assert!(body.schema.is_some());
    }

    #[test]
    fn test_unresolved_schema_reference_fails() {
        let yaml = r#"
openapi: 3.0.3
info:
  title: Broken
  version: 1.0.0
paths:
  /thing:
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Missing'
"#;
        assert!(matches!(build(yaml), Err(GuardError::UnresolvedRef(_))));
    }

    #[test]
    fn test_base_path_variants() {
        assert_eq!(base_path_of("/v2"), "/v2");
        assert_eq!(base_path_of("http://localhost:8080/api/v1/"), "/api/v1");
        assert_eq!(base_path_of("{scheme}://petstore.io/v2"), "/v2");
        assert_eq!(base_path_of("https://petstore.io"), "");
        assert_eq!(base_path_of("petstore"), "");
    }

    #[test]
    fn test_root_path_under_base_path() {
        assert_eq!(join_path("/v2", "/"), "/v2");
        assert_eq!(join_path("", "/"), "/");
        assert_eq!(join_path("/v2", "/pet"), "/v2/pet");
    }
}
