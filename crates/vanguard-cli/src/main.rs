//! Vanguard CLI application
//!
//! Command-line front end over `vanguard-core`: inspect and edit persisted
//! settings, manage credentials, switch between plan and act mode, stream a
//! chat completion from the configured provider and synthesize speech.
//!
//! Logging goes to stderr. `RUST_LOG` overrides the configured level.

mod app;
mod args;
mod commands;
mod console;
mod router;

use args::Cli;
use clap::Parser;
use console::CliConsole;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vanguard_core::config::{LoggingConfig, load_config};
use vanguard_core::VanguardError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let console = CliConsole::new(cli.verbose);

    let config = match load_config(Some(&cli.config)) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default(), cli.verbose);
            console.print_error(&e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging, cli.verbose);

    match router::route(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&console, &e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vanguard_core={0},vanguard={0}", level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.init(),
    }
}

fn report(console: &CliConsole, error: &VanguardError) {
    tracing::debug!(error = ?error, "Command failed");
    console.print_error(error);
}
