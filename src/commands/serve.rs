use crate::config::ValidatorConfig;
use crate::server::{self, AppState};
use crate::loader;
use anyhow::{Context, Result};
use colored::*;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

pub async fn execute_serve(openapi_path: &Path, port: u16, config_path: Option<&Path>) -> Result<()> {
    println!("{}", "Starting validating front-door...".bright_blue());
    println!("  OpenAPI: {}", openapi_path.display());
    if let Some(path) = config_path {
        println!("  Config: {}", path.display());
    }
    println!("  Port: {}", port);
    println!();

    let config = ValidatorConfig::load(config_path).context("cannot load configuration")?;
    if !config.enabled {
        println!("{}", "Validation is disabled; requests pass through".yellow());
    }

    let model = loader::load_schema_model(openapi_path)
        .with_context(|| format!("cannot load contract {}", openapi_path.display()))?;

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let state = AppState::new(Arc::new(model), config);

    server::start_server(addr, state).await?;

    Ok(())
}
