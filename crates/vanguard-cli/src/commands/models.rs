//! Models listing command

use crate::console::CliConsole;
use colored::*;
use vanguard_core::api::models::catalog;
use vanguard_core::api::{ApiProvider, ModelInfo, context_window_info};
use vanguard_core::{VanguardError, VanguardResult};

/// List the built-in catalog of one provider, or of all of them
pub fn list(console: &CliConsole, provider: Option<&str>) -> VanguardResult<()> {
    let providers: Vec<ApiProvider> = match provider {
        Some(name) => vec![ApiProvider::parse(name).ok_or_else(|| {
            VanguardError::validation_field(format!("Unknown provider: {}", name), "provider")
        })?],
        None => ApiProvider::ALL.to_vec(),
    };

    console.print_header("Available Models");
    for provider in providers {
        let models = catalog(provider);
        println!();
        println!("{} ({} models)", provider.name().magenta().bold(), models.len());
        for (id, info) in models.iter() {
            let marker = if id == models.default_model_id {
                "*".green().bold()
            } else {
                " ".normal()
            };
            println!("  {} {} {}", marker, id, describe(info).dimmed());
        }
    }
    println!();
    console.detail("* marks the provider default");
    Ok(())
}

fn describe(info: &ModelInfo) -> String {
    let window = context_window_info(info);
    let mut parts = vec![format!("{}K context", window.context_window / 1000)];
    if let Some(max_tokens) = info.max_tokens {
        parts.push(format!("{} max out", max_tokens));
    }
    if let (Some(input), Some(output)) = (info.input_price, info.output_price) {
        parts.push(format!("${}/${} per M", input, output));
    }
    if info.supports_prompt_cache {
        parts.push("cache".to_string());
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_uses_defaults_for_missing_window() {
        let text = describe(&ModelInfo::default());
        assert_eq!(text, "128K context");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let console = CliConsole::new(false);
        assert!(list(&console, Some("vertex")).is_err());
    }
}
