//! `armbridge config` — Configuration management commands.

use std::path::Path;

use armbridge_config::{AppConfig, HorizonPolicy};

use super::{config_file, load_config};

pub async fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match load_config(path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = advisories(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Peers:     {}", config.bridge.addr());
            println!("   Goals:     {}", config.goal.addr());
            println!("   Horizon:   {}", config.control.horizon);
            println!("   Timeout:   {} ms", config.bridge.reply_timeout_ms);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Settings that load fine but are probably not what the user wants.
fn advisories(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.goal.host == "0.0.0.0" {
        warnings.push("Goal listener bound to 0.0.0.0 accepts goals from any host".to_string());
    }

    if config.bridge.port == config.goal.port && config.bridge.host == config.goal.host {
        warnings.push(format!(
            "Peer server and goal listener share {}",
            config.bridge.addr()
        ));
    }

    if config.control.reset_axes.iter().any(|a| a.abs() > 180.0) {
        warnings.push("control.reset_axes has values outside [-180, 180]".to_string());
    }

    if config.control.wait_for_first_goal && config.control.on_horizon == HorizonPolicy::Continue
    {
        warnings.push("wait_for_first_goal has little effect with on_horizon = continue".to_string());
    }

    warnings
}

pub async fn show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_file(path).display());
    Ok(())
}

pub async fn default() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", AppConfig::default_toml());
    Ok(())
}
