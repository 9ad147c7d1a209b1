use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "openapi-guard")]
#[command(version)]
#[command(about = "Contract-driven request validation for API front-doors", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the operations a contract declares
    Inspect {
        /// Path to OpenAPI file
        #[arg(short, long)]
        openapi: PathBuf,
    },

    /// Validate a single request against a contract
    Check {
        /// Path to OpenAPI file
        #[arg(short, long)]
        openapi: PathBuf,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path, optionally with a query string
        #[arg(short, long)]
        path: String,

        /// Request header as name:value (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Query parameter as name=value (repeatable)
        #[arg(short, long = "query")]
        query: Vec<String>,

        /// File holding the request body
        #[arg(short, long)]
        body: Option<PathBuf>,

        /// Validator configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Start the validating front-door server
    Serve {
        /// Path to OpenAPI file
        #[arg(short, long)]
        openapi: PathBuf,

        /// Port number
        #[arg(short = 'P', long, default_value = "3000")]
        port: u16,

        /// Validator configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
