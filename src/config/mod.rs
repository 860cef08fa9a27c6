mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    expand_paths(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./vidrelay.toml",
        "~/.config/vidrelay/config.toml",
        "/etc/vidrelay/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

fn expand_paths(config: &mut Config) {
    let dir = config.storage.dir.to_string_lossy().into_owned();
    config.storage.dir = shellexpand::tilde(&dir).into_owned().into();
}

/// Longest accepted retention period, 100 years. Keeps every deletion time
/// representable as a timestamp.
const MAX_TTL_HOURS: u64 = 100 * 366 * 24;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.storage.ttl_hours == 0 {
        anyhow::bail!("Storage ttl_hours must be at least 1");
    }

    if config.storage.ttl_hours > MAX_TTL_HOURS {
        anyhow::bail!(
            "Storage ttl_hours is {}, the maximum is {}",
            config.storage.ttl_hours,
            MAX_TTL_HOURS
        );
    }

    if config.storage.sweep_interval_secs > MAX_TTL_HOURS * 3600 {
        anyhow::bail!("Storage sweep_interval_secs is too large");
    }

    if config.storage.sweep_interval_secs == 0 {
        anyhow::bail!("Storage sweep_interval_secs cannot be 0");
    }

    if config.resolver.api_url.is_empty() {
        tracing::warn!("No resolver api_url configured; link submissions will fail");
    }

    if config.channel.enabled {
        if config.channel.bot_token.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!("Channel is enabled but has no bot_token");
        }
        if config.channel.chat_id.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!("Channel is enabled but has no chat_id");
        }
    }

    Ok(())
}
