pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contract;
pub mod error;
pub mod loader;
pub mod models;
pub mod orchestrator;
pub mod routing;
pub mod server;
pub mod telemetry;
pub mod validation;

pub use classify::{ErrorKind, ValidationFailure};
pub use config::ValidatorConfig;
pub use error::{GuardError, Result};
pub use orchestrator::{RequestDescriptor, RequestValidator, ValidatedRequest};
