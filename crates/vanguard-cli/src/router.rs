//! Command routing logic for CLI

use crate::app::App;
use crate::args::{Cli, Commands, ConfigAction};
use crate::commands;
use crate::console::CliConsole;
use vanguard_core::VanguardResult;
use vanguard_core::config::VanguardConfig;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: VanguardConfig) -> VanguardResult<()> {
    // Commands that never touch persisted state
    match &cli.command {
        Commands::Models { provider } => {
            return commands::models::list(&CliConsole::new(cli.verbose), provider.as_deref());
        }
        Commands::Config { action } => {
            let console = CliConsole::new(cli.verbose);
            return match action {
                ConfigAction::Show => commands::config::show(&console, &config, &cli.config),
                ConfigAction::Init { force } => commands::config::init(&console, &cli.config, *force),
            };
        }
        _ => {}
    }

    let app = App::start(&cli, config).await?;
    let result = route_stateful(&app, cli.command).await;
    // Flush even when the command failed so earlier writes are not lost
    let shutdown = app.shutdown().await;
    result.and(shutdown)
}

async fn route_stateful(app: &App, command: Commands) -> VanguardResult<()> {
    match command {
        Commands::State { action } => commands::state::run(app, action).await,
        Commands::Key { action } => commands::key::run(app, action),
        Commands::Mode { mode } => {
            if let Some(mode) = mode {
                app.controller.set_mode(mode.into())?;
                app.console.success(&format!("Switched to {} mode", app.controller.mode()));
            }
            let handler = app.controller.api_handler();
            println!(
                "{} ({} / {})",
                app.controller.mode(),
                handler.provider(),
                handler.get_model().id
            );
            Ok(())
        }
        Commands::History { action } => commands::history::run(app, action).await,
        Commands::Chat {
            message,
            system,
            max_retries,
        } => commands::chat::run(app, &system, &message, max_retries).await,
        Commands::Speak { text, out } => commands::speak::run(app, &text, &out).await,
        Commands::Models { .. } | Commands::Config { .. } => Ok(()),
    }
}
