use clap::Parser;
use openapi_guard::{
    cli::{Cli, Commands},
    commands, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();
    telemetry::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { openapi } => {
            commands::execute_inspect(&openapi)?;
        }
        Commands::Check {
            openapi,
            method,
            path,
            headers,
            query,
            body,
            config,
        } => {
            commands::execute_check(&commands::CheckArgs {
                openapi,
                method,
                path,
                headers,
                query,
                body,
                config,
            })?;
        }
        Commands::Serve {
            openapi,
            port,
            config,
        } => {
            commands::execute_serve(&openapi, port, config.as_deref()).await?;
        }
    }

    Ok(())
}
