use crate::contract::Location;
use crate::loader;
use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

pub fn execute_inspect(openapi_path: &Path) -> Result<()> {
    println!("{}", "Loading OpenAPI file...".bright_blue());
    println!("  Path: {}", openapi_path.display());

    let model = loader::load_schema_model(openapi_path)
        .with_context(|| format!("cannot load contract {}", openapi_path.display()))?;

    println!("\n{}", "✓ Contract compiled successfully".green());
    println!("  Title: {}", model.title().bold());
    println!("  Version: {}", model.version());
    if !model.base_path().is_empty() {
        println!("  Base path: {}", model.base_path());
    }
    println!("  Schemas: {}", model.schemas().len());
    println!();

    if model.operations().is_empty() {
        println!("{}", "No operations found".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Operations ({}):", model.operations().len()).bold()
    );
    for op in model.operations() {
        println!();
        println!(
            "  {} {}",
            op.method.to_string().bright_cyan(),
            op.template.as_str().bold()
        );
        if let Some(ref operation_id) = op.operation_id {
            println!("     Operation: {}", operation_id.bright_yellow());
        }

        for param in &op.parameters {
            let required = if param.required { " (required)" } else { "" };
            let marker = match param.location {
                Location::Path => "path",
                Location::Query => "query",
                Location::Header => "header",
                Location::Body => "body",
            };
            println!("     Param: {} [{}]{}", param.name, marker, required.red());
        }

        if let Some(ref body) = op.body {
            println!(
                "     Body: {}{}",
                body.media_type.as_deref().unwrap_or("any"),
                if body.required { " (required)".red() } else { "".normal() }
            );
        }
    }

    Ok(())
}
