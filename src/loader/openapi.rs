use crate::contract::SchemaModel;
use crate::error::{GuardError, Result};
use crate::models::OpenApiDocument;
use oas3::OpenApiV3Spec;
use std::fs;
use std::path::Path;

/// Load an OpenAPI contract (YAML or JSON) from a file
pub fn load_openapi<P: AsRef<Path>>(path: P) -> Result<OpenApiDocument> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        GuardError::OpenApiLoadError(format!("Failed to read file {}: {}", path.display(), e))
    })?;

    load_openapi_str(&content)
}

/// Parse and check an OpenAPI contract held in memory
pub fn load_openapi_str(content: &str) -> Result<OpenApiDocument> {
    let doc: OpenApiDocument = serde_yaml::from_str(content).map_err(|e| {
        GuardError::OpenApiLoadError(format!("Failed to parse OpenAPI document: {}", e))
    })?;

    // Version first, so Swagger 2.0 is reported as such rather than as a parse error
    check_version(&doc.openapi)?;

    if doc.paths.is_empty() {
        return Err(GuardError::UnsupportedContract(
            "OpenAPI document must have at least one path".to_string(),
        ));
    }

    // oas3 models 3.1 only; it rejects 3.0 keyword shapes such as `exclusiveMinimum: true`
    if doc.openapi.starts_with("3.1") {
        let _: OpenApiV3Spec = serde_yaml::from_str(content).map_err(|e| {
            GuardError::OpenApiLoadError(format!("Invalid OpenAPI document: {}", e))
        })?;
    }

    Ok(doc)
}

/// Load a contract and compile it into a schema model
pub fn load_schema_model<P: AsRef<Path>>(path: P) -> Result<SchemaModel> {
    let doc = load_openapi(path)?;
    SchemaModel::from_document(&doc)
}

fn check_version(version: &str) -> Result<()> {
    if !version.starts_with("3.0") && !version.starts_with("3.1") {
        return Err(GuardError::UnsupportedContract(format!(
            "Unsupported OpenAPI version: {}. Only 3.0.x and 3.1.x are supported.",
            version
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use crate::{RequestDescriptor, RequestValidator, ValidatorConfig};
    use http::Method;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
openapi: 3.0.0
info:
  title: Inventory
  version: 0.3.1
servers:
  - url: https://api.example.com/v1
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: integer
      responses:
        '200':
          description: The item
"#;

    #[test]
    fn test_load_contract_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let doc = load_openapi(file.path()).unwrap();
        assert_eq!(doc.info.title, "Inventory");
        assert_eq!(doc.openapi, "3.0.0");
        assert_eq!(doc.paths.len(), 1);
    }

    #[test]
    fn test_load_schema_model() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let model = load_schema_model(file.path()).unwrap();
        assert_eq!(model.base_path(), "/v1");
        assert!(model.find_operation_by_id("getItem").is_some());
    }

    #[test]
    fn test_load_json_contract() {
        let json = r#"{
  "openapi": "3.1.0",
  "info": {"title": "Json API", "version": "2"},
  "paths": {"/ping": {"get": {"operationId": "ping", "responses": {"200": {"description": "OK"}}}}}
}"#;
        let doc = load_openapi_str(json).unwrap();
        assert_eq!(doc.info.title, "Json API");
    }

    #[test]
    fn test_boolean_exclusive_bounds_in_3_0_contract() {
        let contract = r#"
openapi: 3.0.3
info:
  title: Counters
  version: "1"
paths:
  /counters:
    post:
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              properties:
                step:
                  type: integer
                  minimum: 1
                  exclusiveMinimum: true
      responses:
        '204':
          description: Stored
"#;
        let doc = load_openapi_str(contract).unwrap();
        let model = std::sync::Arc::new(SchemaModel::from_document(&doc).unwrap());
        let validator = RequestValidator::new(model, ValidatorConfig::default());

        let at_bound = RequestDescriptor::new(Method::POST, "/counters").with_body(json!({"step": 1}));
        let failure = validator.validate(&at_bound).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::RequestBodySchemaMismatch);
        assert_eq!(failure.violations[0].pointer, "/step");

        let above = RequestDescriptor::new(Method::POST, "/counters").with_body(json!({"step": 2}));
        assert!(validator.validate(&above).is_ok());
    }

    #[test]
    fn test_swagger_2_rejected() {
        let swagger = MINIMAL.replace("openapi: 3.0.0", "openapi: 2.0.0");
        let result = load_openapi_str(&swagger);
        assert!(matches!(result, Err(GuardError::UnsupportedContract(_))));
    }

    #[test]
    fn test_contract_without_paths_rejected() {
        let (head, _) = MINIMAL.split_once("paths:").unwrap();
        let empty = format!("{}paths: {{}}\n", head);
        assert!(load_openapi_str(&empty).is_err());
    }

    #[test]
    fn test_missing_contract_file() {
        let result = load_openapi("/nonexistent/contract.yaml");
        assert!(matches!(result, Err(GuardError::OpenApiLoadError(_))));
    }
}
