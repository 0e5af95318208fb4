//! Configuration loading, validation, and management for armbridge.
//!
//! Loads configuration from `~/.armbridge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use armbridge_core::command::{DEFAULT_RESET_AXES, DEFAULT_SPEED, JointVector};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.armbridge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Peer WebSocket server
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Goal HTTP listener
    #[serde(default)]
    pub goal: GoalConfig,

    /// Control loop behavior
    #[serde(default)]
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_host")]
    pub host: String,

    #[serde(default = "default_bridge_port")]
    pub port: u16,

    /// Upper bound on the wait for a single peer reply
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

fn default_bridge_host() -> String {
    "0.0.0.0".into()
}
fn default_bridge_port() -> u16 {
    5000
}
fn default_reply_timeout_ms() -> u64 {
    10_000
}

impl BridgeConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_bridge_host(),
            port: default_bridge_port(),
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    #[serde(default = "default_goal_host")]
    pub host: String,

    #[serde(default = "default_goal_port")]
    pub port: u16,
}

fn default_goal_host() -> String {
    "127.0.0.1".into()
}
fn default_goal_port() -> u16 {
    3000
}

impl GoalConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            host: default_goal_host(),
            port: default_goal_port(),
        }
    }
}

/// What the control loop does once an episode has run its full horizon
/// (or the termination hook reported done).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonPolicy {
    /// Stop stepping and wait for the next goal (default)
    #[default]
    Hold,
    /// Issue a reset and start a new episode immediately
    Reset,
    /// Keep stepping past the horizon
    Continue,
}

/// What the control loop does when the peer goes away mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerLossPolicy {
    /// Wait for a new peer, then restart with a reset (default)
    #[default]
    Reawait,
    /// Return the error to the caller
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Steps per episode
    #[serde(default = "default_horizon")]
    pub horizon: u32,

    /// Backoff between checks while no peer is connected
    #[serde(default = "default_poll_ms")]
    pub connection_poll_ms: u64,

    /// Recheck interval while waiting on the goal slot
    #[serde(default = "default_poll_ms")]
    pub goal_poll_ms: u64,

    /// Joint targets of the reset pose
    #[serde(default = "default_reset_axes")]
    pub reset_axes: JointVector,

    /// Speed sent with every command
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// After the initial reset, do not step until a first goal arrives
    #[serde(default)]
    pub wait_for_first_goal: bool,

    #[serde(default)]
    pub on_horizon: HorizonPolicy,

    #[serde(default)]
    pub on_peer_loss: PeerLossPolicy,
}

fn default_horizon() -> u32 {
    120
}
fn default_poll_ms() -> u64 {
    1000
}
fn default_reset_axes() -> JointVector {
    DEFAULT_RESET_AXES
}
fn default_speed() -> f64 {
    DEFAULT_SPEED
}

impl ControlConfig {
    pub fn connection_poll_interval(&self) -> Duration {
        Duration::from_millis(self.connection_poll_ms)
    }

    pub fn goal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.goal_poll_ms)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            connection_poll_ms: default_poll_ms(),
            goal_poll_ms: default_poll_ms(),
            reset_axes: default_reset_axes(),
            speed: default_speed(),
            wait_for_first_goal: false,
            on_horizon: HorizonPolicy::default(),
            on_peer_loss: PeerLossPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.armbridge/config.toml).
    ///
    /// Environment variables override the file:
    /// - `ARMBRIDGE_BRIDGE_HOST`, `ARMBRIDGE_BRIDGE_PORT`
    /// - `ARMBRIDGE_GOAL_HOST`, `ARMBRIDGE_GOAL_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("ARMBRIDGE_BRIDGE_HOST") {
            self.bridge.host = host;
        }
        if let Some(port) = lookup("ARMBRIDGE_BRIDGE_PORT") {
            self.bridge.port = parse_port("ARMBRIDGE_BRIDGE_PORT", &port)?;
        }
        if let Some(host) = lookup("ARMBRIDGE_GOAL_HOST") {
            self.goal.host = host;
        }
        if let Some(port) = lookup("ARMBRIDGE_GOAL_PORT") {
            self.goal.port = parse_port("ARMBRIDGE_GOAL_PORT", &port)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".armbridge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.host.trim().is_empty() || self.goal.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bridge.host and goal.host must not be empty".into(),
            ));
        }

        if self.bridge.port == 0 || self.goal.port == 0 {
            return Err(ConfigError::ValidationError(
                "bridge.port and goal.port must be non-zero".into(),
            ));
        }

        if self.bridge.reply_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "bridge.reply_timeout_ms must be > 0".into(),
            ));
        }

        if self.control.horizon == 0 {
            return Err(ConfigError::ValidationError(
                "control.horizon must be > 0".into(),
            ));
        }

        if self.control.connection_poll_ms == 0 || self.control.goal_poll_ms == 0 {
            return Err(ConfigError::ValidationError(
                "control poll intervals must be > 0".into(),
            ));
        }

        if !self.control.speed.is_finite() || self.control.speed <= 0.0 {
            return Err(ConfigError::ValidationError(
                "control.speed must be a positive finite number".into(),
            ));
        }

        if self.control.reset_axes.iter().any(|a| !a.is_finite()) {
            return Err(ConfigError::ValidationError(
                "control.reset_axes must all be finite".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config default` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key}={value} is not a valid port")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bridge.host, "0.0.0.0");
        assert_eq!(config.bridge.port, 5000);
        assert_eq!(config.goal.port, 3000);
        assert_eq!(config.control.horizon, 120);
        assert_eq!(config.control.speed, 1.5);
        assert_eq!(
            config.control.reset_axes,
            [-180.0, -50.0, 10.0, 5.0, 3.0, 2.0, 1.0]
        );
        assert_eq!(config.control.on_horizon, HorizonPolicy::Hold);
        assert_eq!(config.control.on_peer_loss, PeerLossPolicy::Reawait);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.bridge.port, config.bridge.port);
        assert_eq!(parsed.control.reset_axes, config.control.reset_axes);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
[bridge]
port = 6000

[control]
horizon = 10
on_horizon = "reset"
on_peer_loss = "abort"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bridge.port, 6000);
        assert_eq!(config.bridge.host, "0.0.0.0");
        assert_eq!(config.control.horizon, 10);
        assert_eq!(config.control.on_horizon, HorizonPolicy::Reset);
        assert_eq!(config.control.on_peer_loss, PeerLossPolicy::Abort);
        assert_eq!(config.goal.port, 3000);
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.control.speed = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.control.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.bridge.reply_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.goal.host = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().bridge.port, 5000);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[goal]\nport = 3100\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.goal.port, 3100);
    }

    #[test]
    fn unparsable_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bridge\nport = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("ARMBRIDGE_BRIDGE_HOST", "127.0.0.1"),
            ("ARMBRIDGE_BRIDGE_PORT", "5050"),
            ("ARMBRIDGE_GOAL_PORT", "3030"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bridge.host, "127.0.0.1");
        assert_eq!(config.bridge.port, 5050);
        assert_eq!(config.goal.port, 3030);
        assert_eq!(config.goal.host, "127.0.0.1");
    }

    #[test]
    fn bad_port_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|k| {
            (k == "ARMBRIDGE_GOAL_PORT").then(|| "http".to_string())
        });
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("5000"));
        assert!(toml_str.contains("reply_timeout_ms"));
        assert!(toml_str.contains("hold"));
    }

    #[test]
    fn durations() {
        let config = AppConfig::default();
        assert_eq!(config.bridge.reply_timeout(), Duration::from_secs(10));
        assert_eq!(config.control.connection_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.bridge.addr(), "0.0.0.0:5000");
        assert_eq!(config.goal.addr(), "127.0.0.1:3000");
    }
}
