//! Streamed media download into the file store.

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use vidrelay_common::{Error, Result};
use vidrelay_store::{FileStore, StoredFile};

/// Download `media_url` into the store under `filename`.
///
/// The body is written chunk by chunk to a partial file of its own that is
/// renamed into place once complete, so a reader never sees a half-written
/// file under the final name. Of two concurrent downloads of the same name,
/// the one that finishes last wins.
pub async fn download_to_store(
    client: &Client,
    media_url: &str,
    store: &FileStore,
    filename: &str,
) -> Result<StoredFile> {
    let response = client
        .get(media_url)
        .send()
        .await
        .map_err(|e| Error::upstream(format!("Media request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::upstream(format!(
            "Media host returned {}",
            response.status()
        )));
    }

    let token = Uuid::new_v4().simple().to_string();
    let mut file = store.create_partial(filename, &token).await?;
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;

    let outcome: Result<()> = async {
        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| Error::upstream(format!("Media download interrupted: {e}")))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;
    drop(file);

    if let Err(e) = outcome {
        if let Err(cleanup) = store.discard_partial(filename, &token).await {
            tracing::warn!(filename, error = %cleanup, "Failed to remove partial download");
        }
        return Err(e);
    }

    let stored = store.commit_partial(filename, &token).await?;
    tracing::info!(filename, bytes = written, "Download complete");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        let payload = vec![42u8; 256 * 1024];
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let stored = download_to_store(
            &Client::new(),
            &format!("{}/v.mp4", server.uri()),
            &store,
            "clip.mp4",
        )
        .await
        .unwrap();

        assert_eq!(stored.size, payload.len() as u64);
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), payload);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_download_failure_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = download_to_store(
            &Client::new(),
            &format!("{}/missing.mp4", server.uri()),
            &store,
            "clip.mp4",
        )
        .await
        .unwrap_err();

        assert_matches!(err, Error::Upstream(_));
        assert!(store.list().await.unwrap().is_empty());
    }
}
