//! Acquisition: turn a video page URL into a stored, scheduled, published file.
//!
//! 1. The [`LinkResolver`] asks the extraction API for a direct media link.
//! 2. The media is streamed into the file store under a filename sanitized
//!    from the upstream title.
//! 3. The file is registered with the retention scheduler (one-shot deletion
//!    at `now + TTL`).
//! 4. A post is sent to the messaging channel, if one is configured. Publish
//!    failures are logged and never fail the acquisition.

mod download;
mod publisher;
mod resolver;

pub use download::download_to_store;
pub use publisher::{ChannelPost, ChannelPublisher, TelegramPublisher};
pub use resolver::{parse_resolver_payload, HttpLinkResolver, LinkResolver, ResolvedMedia};

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};
use uuid::Uuid;
use vidrelay_common::paths::media_filename;
use vidrelay_common::{Error, Result};
use vidrelay_store::FileStore;

use crate::config::Config;
use crate::retention::RetentionScheduler;

/// Upper bound on a single media download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// A completed acquisition.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub title: String,
    pub filename: String,
    pub size: u64,
    /// Id of the one-shot deletion registered for the file.
    pub deletion_id: Uuid,
    /// Site-relative playback link, e.g. `/watch/clip.mp4`.
    pub watch_path: String,
    /// Site-relative download link, e.g. `/downloads/clip.mp4`.
    pub download_path: String,
}

pub struct Acquirer {
    resolver: Arc<dyn LinkResolver>,
    publisher: Option<Arc<dyn ChannelPublisher>>,
    client: Client,
    store: FileStore,
    scheduler: RetentionScheduler,
    public_url: String,
}

impl Acquirer {
    pub fn new(
        resolver: Arc<dyn LinkResolver>,
        publisher: Option<Arc<dyn ChannelPublisher>>,
        store: FileStore,
        scheduler: RetentionScheduler,
        public_url: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            resolver,
            publisher,
            client,
            store,
            scheduler,
            public_url: public_url.into(),
        }
    }

    /// Wire up the HTTP resolver and, when enabled, the Telegram publisher.
    pub fn from_config(config: &Config, store: FileStore, scheduler: RetentionScheduler) -> Self {
        let publisher = TelegramPublisher::from_config(&config.channel)
            .map(|p| Arc::new(p) as Arc<dyn ChannelPublisher>);

        Self::new(
            Arc::new(HttpLinkResolver::new(&config.resolver)),
            publisher,
            store,
            scheduler,
            config.server.public_url.clone(),
        )
    }

    /// Resolve, download, register for deletion and publish one video.
    pub async fn acquire(&self, page_url: &str) -> Result<Acquired> {
        let page_url = validate_page_url(page_url)?;

        let media = self.resolver.resolve(page_url.as_str()).await?;
        let filename = media_filename(&media.title);
        tracing::info!(url = %page_url, filename = %filename, "Resolved media link");

        let stored =
            download_to_store(&self.client, &media.media_url, &self.store, &filename).await?;
        let deletion_id = self.scheduler.schedule_deletion(&stored.filename);

        let acquired = Acquired {
            title: media.title,
            watch_path: site_path("watch", &stored.filename),
            download_path: site_path("downloads", &stored.filename),
            filename: stored.filename,
            size: stored.size,
            deletion_id,
        };

        if let Some(ref publisher) = self.publisher {
            let post = ChannelPost {
                title: acquired.title.clone(),
                watch_url: public_link(&self.public_url, "watch", &acquired.filename),
                download_url: public_link(&self.public_url, "downloads", &acquired.filename),
            };
            match publisher.publish(&post).await {
                Ok(()) => tracing::info!(filename = %acquired.filename, "Published to channel"),
                Err(e) => {
                    tracing::warn!(filename = %acquired.filename, error = %e, "Failed to publish to channel")
                }
            }
        }

        Ok(acquired)
    }
}

/// Accept only absolute http(s) URLs.
fn validate_page_url(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::invalid_input("Please enter a video URL"));
    }

    let url = Url::parse(input).map_err(|_| Error::invalid_input("Not a valid URL"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::invalid_input(format!("Unsupported URL scheme: {other}"))),
    }
}

/// Absolute link under `base`, with the filename percent-encoded.
pub fn public_link(base: &str, prefix: &str, filename: &str) -> String {
    let Ok(mut url) = Url::parse(base) else {
        return format!("{}{}", base.trim_end_matches('/'), site_path(prefix, filename));
    };

    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.pop_if_empty().push(prefix).push(filename);
        }
        Err(()) => {
            return format!("{}{}", base.trim_end_matches('/'), site_path(prefix, filename));
        }
    }
    url.into()
}

/// Site-relative link, with the filename percent-encoded.
pub fn site_path(prefix: &str, filename: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return format!("/{prefix}/{filename}");
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(prefix).push(filename);
    }
    url.path().to_string()
}
