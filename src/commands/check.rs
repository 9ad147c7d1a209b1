use crate::config::ValidatorConfig;
use crate::loader;
use crate::orchestrator::{RequestDescriptor, RequestValidator};
use crate::validation::{BodyValue, QueryParams};
use anyhow::{Context, Result, bail};
use colored::*;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments of `check`
pub struct CheckArgs {
    pub openapi: PathBuf,
    pub method: String,
    pub path: String,
    pub headers: Vec<String>,
    pub query: Vec<String>,
    pub body: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub fn execute_check(args: &CheckArgs) -> Result<()> {
    let config = ValidatorConfig::load(args.config.as_deref()).context("cannot load configuration")?;
    let model = loader::load_schema_model(&args.openapi)
        .with_context(|| format!("cannot load contract {}", args.openapi.display()))?;
    let validator = RequestValidator::new(Arc::new(model), config);

    let request = build_request(args)?;

    println!("{}", "Validating request...".bright_blue());
    println!("  {} {}", request.method, request.path);

    match validator.validate(&request) {
        Ok(validated) => {
            println!("\n{}", "✓ Request is valid".green());
            println!("  Operation: {}", validated.operation.label().bright_yellow());
            for (name, value) in &validated.path_params {
                println!("  Path param: {} = {}", name, value);
            }
            Ok(())
        }
        Err(failure) => {
            println!("\n{}", "✗ Request rejected".red().bold());
            println!("  Status: {}", failure.status());
            println!("  Code: {}", failure.kind.code().bold());
            println!("  {}", failure.message);
            for violation in &failure.violations {
                println!("    - {}", violation.format().red());
            }
            println!();
            println!("{}", serde_json::to_string_pretty(&failure.payload())?);
            bail!("request failed validation with {}", failure.kind.code())
        }
    }
}

fn build_request(args: &CheckArgs) -> Result<RequestDescriptor> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{}'", args.method))?;

    let (path, query_string) = match args.path.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query)),
        None => (args.path.clone(), None),
    };
    let mut query = query_string
        .map(QueryParams::from_query_string)
        .unwrap_or_default();
    for pair in &args.query {
        let (name, value) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
        query.insert(name, value);
    }

    let mut headers = HeaderMap::new();
    for pair in &args.headers {
        let (name, value) = pair
            .split_once(':')
            .with_context(|| format!("header '{}' must look like name:value", pair))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("invalid header name '{}'", name))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("invalid value for header '{}'", name))?;
        headers.append(name, value);
    }

    let body = match &args.body {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("cannot read body file {}", path.display()))?;
            BodyValue::from_bytes(&bytes)
        }
        None => BodyValue::Absent,
    };

    Ok(RequestDescriptor::new(method, path)
        .with_headers(headers)
        .with_query(query)
        .with_body(body))
}
