use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Failed to load OpenAPI file: {0}")]
    OpenApiLoadError(String),

    #[error("Unsupported contract: {0}")]
    UnsupportedContract(String),

    #[error("Invalid contract: {0}")]
    ContractError(String),

    #[error("Unresolved schema reference: {0}")]
    UnresolvedRef(String),

    #[error("Invalid path template '{template}': {reason}")]
    InvalidPathTemplate { template: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    RegexError(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, GuardError>;
