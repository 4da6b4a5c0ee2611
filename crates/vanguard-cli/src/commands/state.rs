//! Settings commands

use crate::app::App;
use crate::args::{Scope, StateAction};
use colored::*;
use serde_json::Value;
use vanguard_core::{GlobalStateKey, LocalStateKey, VanguardError, VanguardResult};

pub async fn run(app: &App, action: StateAction) -> VanguardResult<()> {
    match action {
        StateAction::Get { key, scope } => get(app, &key, scope),
        StateAction::Set { key, value, scope } => set(app, &key, &value, scope),
        StateAction::List { scope } => list(app, scope),
        StateAction::Reset { scope } => reset(app, scope).await,
    }
}

fn get(app: &App, key: &str, scope: Scope) -> VanguardResult<()> {
    let value = match scope {
        Scope::Global => app.state().get_global(global_key(key)?)?,
        Scope::Workspace => app.state().get_workspace(key.parse::<LocalStateKey>()?)?,
    };
    match value {
        Some(value) => println!("{}", render(&value)),
        None => app.console.warn(&format!("{} is not set", key)),
    }
    Ok(())
}

fn set(app: &App, key: &str, raw: &str, scope: Scope) -> VanguardResult<()> {
    let value = parse_value(raw);
    match scope {
        Scope::Global => app.state().set_global(global_key(key)?, value)?,
        Scope::Workspace => app
            .state()
            .set_workspace(key.parse::<LocalStateKey>()?, value)?,
    }
    app.controller.rebuild_api_handler()?;
    app.console.success(&format!("Set {}", key));
    Ok(())
}

fn list(app: &App, scope: Scope) -> VanguardResult<()> {
    app.console.print_header(match scope {
        Scope::Global => "Global settings",
        Scope::Workspace => "Workspace settings",
    });

    let entries: Vec<(&str, Value)> = match scope {
        Scope::Global => GlobalStateKey::ALL
            .iter()
            .filter(|key| **key != GlobalStateKey::TaskHistory)
            .filter_map(|key| {
                app.state()
                    .get_global(*key)
                    .transpose()
                    .map(|value| value.map(|value| (key.as_str(), value)))
            })
            .collect::<VanguardResult<_>>()?,
        Scope::Workspace => LocalStateKey::ALL
            .iter()
            .filter_map(|key| {
                app.state()
                    .get_workspace(*key)
                    .transpose()
                    .map(|value| value.map(|value| (key.as_str(), value)))
            })
            .collect::<VanguardResult<_>>()?,
    };

    if entries.is_empty() {
        app.console.info("Nothing set");
    }
    for (key, value) in entries {
        println!("  {} = {}", key.cyan(), render(&value));
    }
    Ok(())
}

async fn reset(app: &App, scope: Scope) -> VanguardResult<()> {
    match scope {
        Scope::Global => {
            app.controller.reset_global_state().await?;
            app.console.success("Global settings and secrets cleared");
        }
        Scope::Workspace => {
            app.controller.reset_workspace_state().await?;
            app.console.success("Workspace settings cleared");
        }
    }
    Ok(())
}

fn global_key(key: &str) -> VanguardResult<GlobalStateKey> {
    match key.parse::<GlobalStateKey>()? {
        GlobalStateKey::TaskHistory => Err(VanguardError::validation_field(
            "Use 'vanguard history' for the task history",
            key,
        )),
        key => Ok(key),
    }
}

/// JSON when it parses, otherwise the raw text as a string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
