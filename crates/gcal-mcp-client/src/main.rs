//! gcal-mcp CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use gcal_mcp_core::{TracingConfig, TracingOutputFormat, init_tracing};
use tracing::Level;

use gcal_mcp_client::cli::{AuthProvider, Cli, Command, ConfigAction, LogFormat};
use gcal_mcp_client::commands;
use gcal_mcp_client::config::ClientConfig;
use gcal_mcp_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(tracing_config(&cli)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn tracing_config(cli: &Cli) -> TracingConfig {
    let config = match (&cli.command, cli.debug) {
        (Command::Run, true) => TracingConfig::stdio_server().with_level(Level::DEBUG),
        (Command::Run, false) => TracingConfig::stdio_server(),
        (_, true) => TracingConfig::cli_debug(),
        (_, false) => TracingConfig::default(),
    };
    let format = match cli.log_format {
        LogFormat::Pretty => TracingOutputFormat::Pretty,
        LogFormat::Compact => TracingOutputFormat::Compact,
        LogFormat::Json => TracingOutputFormat::Json,
    };
    config.with_format(format)
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    match cli.command {
        Command::Run => commands::run::run(&config).await,
        Command::Init {
            name,
            claude_config,
        } => commands::init::init(&name, claude_config, cli.config.as_deref()),
        Command::Auth { provider } => match provider {
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                commands::auth::google(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    &config,
                    &config_path,
                )
                .await
            }
        },
        Command::Tools => commands::tools::print(&config),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
