mod config;

pub use config::{LogFormat, TelemetryConfig};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber from `LOG_FORMAT` and `RUST_LOG`
pub fn init_tracing() {
    init_with(&TelemetryConfig::from_env());
}

pub fn init_with(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{}': {}. Using defaults.", config.filter, e);
        EnvFilter::new(TelemetryConfig::default().filter)
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true);

    // A subscriber may already be installed (tests, embedding hosts)
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
