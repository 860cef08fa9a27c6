use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used for links posted to the channel
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding downloaded media (created on startup)
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,

    /// Age after which a stored file is deleted
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Cadence of the retention sweep, aligned to multiples of itself
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("downloads")
}
fn default_ttl_hours() -> u64 {
    24
}
fn default_sweep_interval() -> u64 {
    3600
}

impl StorageConfig {
    /// Retention period; saturates for hour counts no `Duration` can hold,
    /// which `validate_config` rejects.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            ttl_hours: default_ttl_hours(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Link extraction endpoint, called as `GET {api_url}?url=<video url>`
    #[serde(default)]
    pub api_url: String,

    /// Sent as `X-Api-Key` when set
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_resolver_timeout")]
    pub timeout_secs: u64,
}

fn default_resolver_timeout() -> u64 {
    30
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: None,
            timeout_secs: default_resolver_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_channel_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub bot_token: Option<String>,

    /// Target chat, e.g. `@my_channel` or a numeric id
    #[serde(default)]
    pub chat_id: Option<String>,
}

fn default_channel_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_channel_api_base(),
            bot_token: None,
            chat_id: None,
        }
    }
}
