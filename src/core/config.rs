//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.armtree/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use crate::core::navigator::{DEBUG_EXPAND_TIMEOUT, DEFAULT_EXPAND_TIMEOUT};
use crate::core::tracker::{DEFAULT_OPERATION_TIMEOUT, DEFAULT_POLL_INTERVAL, TrackerConfig};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ArmtreeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tracker: TrackerSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub expand_timeout_secs: Option<u64>,
    pub debug_expand_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    pub access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TrackerSection {
    pub poll_interval_secs: Option<u64>,
    pub operation_timeout_secs: Option<u64>,
}

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub api_version: String,
    pub access_token: Option<String>,
    pub debug: bool,
    /// Already switched to the debug deadline when `debug` is set.
    pub expand_timeout: Duration,
    pub tracker: TrackerConfig,
}

/// Values taken from command-line flags.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub debug: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.armtree/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".armtree").join("config.toml"))
}

/// Load config from `~/.armtree/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `ArmtreeConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<ArmtreeConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(ArmtreeConfig::default());
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<ArmtreeConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(ArmtreeConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ArmtreeConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    // Never log the token.
    debug!(
        "Config: general={:?} tracker={:?} token set: {}",
        config.general,
        config.tracker,
        config.auth.access_token.is_some()
    );
    Ok(config)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# armtree configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# base_url = "https://management.azure.com"   # Or ARMTREE_BASE_URL, or --base-url
# api_version = "2021-04-01"
# expand_timeout_secs = 45
# debug_expand_timeout_secs = 600             # Used with --debug

# [auth]
# access_token = "eyJ0eXAi..."                # Or ARMTREE_ACCESS_TOKEN / AZURE_ACCESS_TOKEN

# [tracker]
# poll_interval_secs = 15
# operation_timeout_secs = 900
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_TEMPLATE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &ArmtreeConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

fn resolve_with_env(
    config: &ArmtreeConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Base URL: CLI → env → config → default
    let base_url = cli
        .base_url
        .clone()
        .or_else(|| env("ARMTREE_BASE_URL"))
        .or_else(|| config.general.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // Token: env → config
    let access_token = env("ARMTREE_ACCESS_TOKEN")
        .or_else(|| env("AZURE_ACCESS_TOKEN"))
        .or_else(|| config.auth.access_token.clone())
        .filter(|t| !t.trim().is_empty());

    let expand_timeout = if cli.debug {
        config
            .general
            .debug_expand_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEBUG_EXPAND_TIMEOUT)
    } else {
        config
            .general
            .expand_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_EXPAND_TIMEOUT)
    };

    ResolvedConfig {
        base_url,
        api_version: config
            .general
            .api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        access_token,
        debug: cli.debug,
        expand_timeout,
        tracker: TrackerConfig {
            poll_interval: config
                .tracker
                .poll_interval_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            operation_timeout: config
                .tracker
                .operation_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_OPERATION_TIMEOUT),
        },
    }
}
