//! Direct media link resolution through an external extraction API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use vidrelay_common::{Error, Result};

use crate::config::ResolverConfig;

/// Header carrying the resolver API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Field names that may carry the direct media link, in preference order.
const MEDIA_URL_FIELDS: &[&str] = &["download_url", "media_url", "url", "play"];

/// What the resolver knows about a video page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub title: String,
    pub media_url: String,
}

/// Turns a video-hosting page URL into a direct media link.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, page_url: &str) -> Result<ResolvedMedia>;
}

/// Resolver backed by `GET {api_url}?url=<page url>`.
///
/// The response is JSON, either flat or wrapped in a `data` object, with a
/// `title` and one of `download_url`, `media_url`, `url` or `play`.
pub struct HttpLinkResolver {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpLinkResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl LinkResolver for HttpLinkResolver {
    async fn resolve(&self, page_url: &str) -> Result<ResolvedMedia> {
        if self.api_url.is_empty() {
            return Err(Error::upstream("No resolver API configured"));
        }

        let mut request = self.client.get(&self.api_url).query(&[("url", page_url)]);
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Resolver request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(format!(
                "Resolver returned {status}: {body}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("Resolver returned invalid JSON: {e}")))?;

        parse_resolver_payload(&payload)
    }
}

/// Extract title and media link from a resolver response body.
pub fn parse_resolver_payload(payload: &Value) -> Result<ResolvedMedia> {
    let body = match payload.get("data") {
        Some(data) if data.is_object() => data,
        _ => payload,
    };

    let media_url = MEDIA_URL_FIELDS
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|url| !url.is_empty())
        .ok_or_else(|| Error::upstream("Resolver response has no media link"))?;

    let title = body
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(ResolvedMedia {
        title: title.to_string(),
        media_url: media_url.to_string(),
    })
}
