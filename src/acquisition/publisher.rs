//! Republishing downloaded media to a messaging channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use vidrelay_common::{Error, Result};

use crate::config::ChannelConfig;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// A post announcing a newly stored video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPost {
    pub title: String,
    pub watch_url: String,
    pub download_url: String,
}

impl ChannelPost {
    pub fn caption(&self) -> String {
        if self.title.is_empty() {
            self.watch_url.clone()
        } else {
            format!("{}\n{}", self.title, self.watch_url)
        }
    }
}

/// Destination for [`ChannelPost`]s.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    async fn publish(&self, post: &ChannelPost) -> Result<()>;
}

/// Publishes through a Telegram-style bot API (`sendVideo` by URL).
pub struct TelegramPublisher {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramPublisher {
    /// Build a publisher from config; `None` when the channel is disabled or
    /// incomplete.
    pub fn from_config(config: &ChannelConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let bot_token = config.bot_token.clone().filter(|t| !t.is_empty())?;
        let chat_id = config.chat_id.clone().filter(|c| !c.is_empty())?;

        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Some(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }
}

#[async_trait]
impl ChannelPublisher for TelegramPublisher {
    async fn publish(&self, post: &ChannelPost) -> Result<()> {
        let url = format!("{}/bot{}/sendVideo", self.api_base, self.bot_token);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "video": post.download_url,
                "caption": post.caption(),
            }))
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Channel request failed: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() || body.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("no description");
            return Err(Error::upstream(format!(
                "Channel publish failed ({status}): {description}"
            )));
        }

        Ok(())
    }
}
