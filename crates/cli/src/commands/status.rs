//! `armbridge status` — Show the effective configuration.

use std::path::Path;

use super::{config_file, load_config};

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    let control = &config.control;

    println!("🦾 armbridge Status");
    println!("==================");
    println!("  Config file:   {}", config_file(path).display());
    println!("  Peer server:   ws://{}", config.bridge.addr());
    println!("  Goal listener: http://{}", config.goal.addr());
    println!("  Reply timeout: {} ms", config.bridge.reply_timeout_ms);
    println!("  Horizon:       {} steps", control.horizon);
    println!("  Reset pose:    {:?}", control.reset_axes);
    println!("  Speed:         {}", control.speed);
    println!("  On horizon:    {:?}", control.on_horizon);
    println!("  On peer loss:  {:?}", control.on_peer_loss);
    println!(
        "  First goal:    {}",
        if control.wait_for_first_goal {
            "required"
        } else {
            "not required"
        }
    );

    if config_file(path).exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — running on defaults (see `armbridge config default`)");
    }

    Ok(())
}
