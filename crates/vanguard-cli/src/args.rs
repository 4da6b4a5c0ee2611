//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "vanguard.toml";

#[derive(Parser)]
#[command(name = "vanguard")]
#[command(about = "Vanguard - settings, provider streaming and speech for the Vanguard agent")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (json, toml or yaml)
    #[arg(long, global = true, env = "VANGUARD_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Keep all settings in memory for this run
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read and write persisted settings
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Manage provider credentials
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Show or switch the operating mode
    Mode {
        /// New mode; omit to print the current one
        #[arg(value_enum)]
        mode: Option<ModeArg>,
    },

    /// Inspect the task history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Send one message to the provider configured for the current mode
    Chat {
        /// User message
        message: String,

        /// System prompt
        #[arg(long, default_value = "You are a helpful coding assistant.")]
        system: String,

        /// Retries for rate limits and server errors
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
    },

    /// Synthesize speech and write it to a file
    Speak {
        /// Text to speak
        text: String,

        /// Output audio file
        #[arg(long, short, default_value = "speech.wav")]
        out: PathBuf,
    },

    /// List the built-in model catalogs
    Models {
        /// Only this provider (cline, anthropic, groq, xai)
        provider: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum StateAction {
    /// Print one setting
    Get {
        /// Storage name, e.g. `planModeApiProvider`
        key: String,

        #[arg(long, value_enum, default_value = "global")]
        scope: Scope,
    },

    /// Set one setting; the value is parsed as JSON, falling back to a string
    Set {
        key: String,
        value: String,

        #[arg(long, value_enum, default_value = "global")]
        scope: Scope,
    },

    /// List the settings that have a value
    List {
        #[arg(long, value_enum, default_value = "global")]
        scope: Scope,
    },

    /// Wipe a partition
    Reset {
        /// `global` also wipes secrets
        #[arg(long, value_enum, default_value = "workspace")]
        scope: Scope,
    },
}

#[derive(Subcommand, Clone)]
pub enum KeyAction {
    /// Store a credential; an empty value deletes it
    Save {
        /// Key name, e.g. `anthropicApiKey`
        key: String,
        value: String,
    },

    /// Show which credentials are set, never their values
    List,
}

#[derive(Subcommand, Clone)]
pub enum HistoryAction {
    /// Print the task history
    List {
        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the history whenever another process rewrites it
    Watch,
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Write the default configuration to a file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Global,
    Workspace,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Plan,
    Act,
}

impl From<ModeArg> for vanguard_core::Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Plan => vanguard_core::Mode::Plan,
            ModeArg::Act => vanguard_core::Mode::Act,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_state_set() {
        let cli = Cli::parse_from([
            "vanguard",
            "--ephemeral",
            "state",
            "set",
            "mode",
            "plan",
            "--scope",
            "global",
        ]);
        assert!(cli.ephemeral);
        match cli.command {
            Commands::State {
                action: StateAction::Set { key, value, scope },
            } => {
                assert_eq!(key, "mode");
                assert_eq!(value, "plan");
                assert_eq!(scope, Scope::Global);
            }
            _ => panic!("expected state set"),
        }
    }

    #[test]
    fn test_parse_mode_switch() {
        let cli = Cli::parse_from(["vanguard", "mode", "plan"]);
        assert!(matches!(cli.command, Commands::Mode { mode: Some(ModeArg::Plan) }));
    }
}
