//! Configuration management commands

use crate::console::CliConsole;
use colored::*;
use std::path::Path;
use vanguard_core::config::VanguardConfig;
use vanguard_core::{VanguardError, VanguardResult};

/// Show the effective configuration after all layers were applied
pub fn show(console: &CliConsole, config: &VanguardConfig, config_file: &Path) -> VanguardResult<()> {
    console.print_header("Configuration");
    if config_file.exists() {
        console.success(&format!("Loaded configuration from: {}", config_file.display()));
    } else {
        console.warn(&format!(
            "Configuration file not found: {}",
            config_file.display()
        ));
        console.info("Using defaults and environment");
    }

    println!();
    println!("{}", "Storage".cyan().bold());
    println!("  global dir:         {}", config.global_dir().display());
    println!("  workspace dir:      {}", config.workspace_dir().display());
    println!("  persistence delay:  {}ms", config.storage.persistence_delay_ms);
    println!(
        "  history watch:      {}",
        if config.storage.watch_history {
            format!("on ({}ms stability)", config.storage.history_stability_ms)
        } else {
            "off".to_string()
        }
    );

    println!("{}", "Providers".cyan().bold());
    let endpoints = &config.providers.endpoints;
    for (name, url) in [
        ("cline", &endpoints.cline),
        ("anthropic", &endpoints.anthropic),
        ("groq", &endpoints.groq),
        ("xai", &endpoints.xai),
    ] {
        println!(
            "  {:<19} {}",
            format!("{} endpoint:", name),
            url.as_deref().unwrap_or("default")
        );
    }
    if let Some(timeout) = config.providers.request_timeout_ms {
        println!("  request timeout:    {}ms", timeout);
    }

    println!("{}", "Speech".cyan().bold());
    println!("  endpoint:           {}/{}", config.tts.base_url, config.tts.model_path);
    println!("  voice:              {}", config.tts.voice);
    println!(
        "  cache:              {} entries, {}s TTL",
        config.tts.cache_capacity, config.tts.cache_ttl_secs
    );

    println!("{}", "Logging".cyan().bold());
    println!("  level:              {}", config.logging.level);
    println!("  format:             {}", config.logging.format);
    Ok(())
}

/// Write the defaults, as JSON for `.json` paths and TOML otherwise
pub fn init(console: &CliConsole, config_file: &Path, force: bool) -> VanguardResult<()> {
    if config_file.exists() && !force {
        return Err(VanguardError::config_with_context(
            format!("Configuration file already exists: {}", config_file.display()),
            "Pass --force to overwrite it",
        ));
    }
    let content = render_defaults(config_file)?;
    std::fs::write(config_file, content)
        .map_err(|e| VanguardError::io_with_path(e.to_string(), config_file.display().to_string()))?;
    console.success(&format!("Created {}", config_file.display()));
    Ok(())
}

fn render_defaults(config_file: &Path) -> VanguardResult<String> {
    let config = VanguardConfig::default();
    match config_file.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(serde_json::to_string_pretty(&config)?),
        _ => toml::to_string_pretty(&config)
            .map_err(|e| VanguardError::config(format!("Cannot render configuration: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vanguard_core::config::ConfigLoader;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let console = CliConsole::new(false);
        for name in ["vanguard.toml", "vanguard.json"] {
            let path = dir.path().join(name);
            init(&console, &path, false).unwrap();
            let loaded = ConfigLoader::new().with_file(&path).load().unwrap();
            assert_eq!(loaded, VanguardConfig::default());
        }
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let console = CliConsole::new(false);
        let path = dir.path().join("vanguard.toml");
        std::fs::write(&path, "").unwrap();

        assert!(init(&console, &path, false).is_err());
        init(&console, &path, true).unwrap();
    }
}
