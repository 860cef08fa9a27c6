//! Direct streaming with HTTP range requests.
//!
//! Serves stored media files with support for single byte-range requests.
//! Bodies are streamed from disk in bounded chunks, so memory stays flat and
//! reads are paced by how fast the client drains the socket.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use vidrelay_common::paths::content_type_for;
use vidrelay_common::Error;
use vidrelay_store::FileStore;

use super::range::resolve_range_header;
use crate::server::AppContext;

/// Read size used when streaming file bodies.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

const NOT_FOUND_BODY: &str = "Video not found";

/// `GET /watch/:filename` - stream with range support.
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    let range = headers.get(header::RANGE).map(|h| h.to_str().unwrap_or(""));

    serve_file(&ctx.store, &filename, range).await
}

/// `GET /downloads/:filename` - plain full-file fetch as an attachment.
pub async fn download_file(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> Response {
    let response = match full_response(&ctx.store, &filename).await {
        Ok(response) => response,
        Err(e) => return StreamError(e).into_response(),
    };

    let (mut parts, body) = response.into_parts();
    if let Ok(value) = attachment_disposition(&filename).parse() {
        parts.headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Response::from_parts(parts, body)
}

/// Serve `filename` from the store, honoring an optional `Range` header value.
///
/// Responds 200 with the whole file when there is no range, 206 with exactly
/// the requested bytes otherwise, 416 for a malformed or unsatisfiable range
/// and 404 when the file does not exist.
pub async fn serve_file(store: &FileStore, filename: &str, range: Option<&str>) -> Response {
    let result = match range {
        Some(range) => partial_response(store, filename, range).await,
        None => full_response(store, filename).await,
    };

    result.unwrap_or_else(|e| StreamError(e).into_response())
}

async fn full_response(store: &FileStore, filename: &str) -> Result<Response, Error> {
    let (file, stat) = store.open(filename).await?;

    tracing::debug!(filename, size = stat.size, "Streaming full file");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(filename))
        .header(header::CONTENT_LENGTH, stat.size.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .body(body_from_reader(file, filename))
        .map_err(|e| Error::invalid_input(format!("Failed to build response: {e}")))
}

async fn partial_response(
    store: &FileStore,
    filename: &str,
    range_header: &str,
) -> Result<Response, Error> {
    // Size and body must come from the same handle: the name can be replaced
    // by a newer download at any time.
    let (file, stat) = store.open(filename).await?;
    let range = resolve_range_header(range_header, stat.size)?;
    let reader = FileStore::take_range(file, range.start, range.end).await?;

    tracing::debug!(
        filename,
        start = range.start,
        end = range.end,
        size = stat.size,
        "Streaming byte range"
    );

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type_for(filename))
        .header(header::CONTENT_LENGTH, range.length().to_string())
        .header(header::CONTENT_RANGE, range.content_range(stat.size))
        .header(header::ACCEPT_RANGES, "bytes")
        .body(body_from_reader(reader, filename))
        .map_err(|e| Error::invalid_input(format!("Failed to build response: {e}")))
}

/// Wrap a reader into a streaming body.
///
/// A read error ends the stream with an error, which makes hyper drop the
/// connection instead of sending a truncated body as if it were complete.
fn body_from_reader<R>(reader: R, filename: &str) -> Body
where
    R: AsyncRead + Send + 'static,
{
    let filename = filename.to_string();
    let stream = ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE).inspect_err(move |e| {
        tracing::debug!(filename = %filename, error = %e, "Aborting stream after read error");
    });
    Body::from_stream(stream)
}

fn attachment_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' => '\'',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{ascii}\"")
}

/// Maps store errors onto the only statuses clients ever see here.
struct StreamError(Error);

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::RangeNotSatisfiable { size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response(),
            ref e if e.is_not_found() => not_found(),
            Error::InvalidFilename(_) => not_found(),
            other => {
                tracing::warn!(error = %other, "Failed to open file for streaming");
                not_found()
            }
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
        .into_response()
}
