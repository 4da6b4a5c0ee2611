//! Credential commands

use crate::app::App;
use crate::args::KeyAction;
use colored::*;
use vanguard_core::{SecretKey, VanguardResult};

pub fn run(app: &App, action: KeyAction) -> VanguardResult<()> {
    match action {
        KeyAction::Save { key, value } => {
            app.controller.save_api_key(&key, &value)?;
            if value.trim().is_empty() {
                app.console.success(&format!("Removed {}", key));
            } else {
                app.console.success(&format!("Saved {}", key));
            }
            Ok(())
        }
        KeyAction::List => {
            app.console.print_header("Credentials");
            let mut any = false;
            for key in SecretKey::ALL {
                if app.state().get_secret(*key)?.is_some() {
                    println!("  {} {}", "●".green(), key);
                    any = true;
                }
            }
            if !any {
                app.console.info("No credentials stored");
            }
            Ok(())
        }
    }
}
