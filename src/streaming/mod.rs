//! Media streaming module.
//!
//! Serves stored files straight from the file store.
//!
//! # Routes
//!
//! - `GET /watch/{filename}` - Progressive playback with range support
//! - `GET /downloads/{filename}` - Full-file download as an attachment

mod direct;
pub mod range;

pub use direct::{download_file, serve_file, stream_file};
pub use range::{parse_range_header, resolve_range_header, ByteRange, RangeSpec};

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the playback router, mounted at `/watch`.
pub fn watch_router() -> Router<AppContext> {
    Router::new().route("/:filename", get(stream_file))
}

/// Create the download router, mounted at `/downloads`.
pub fn download_router() -> Router<AppContext> {
    Router::new().route("/:filename", get(download_file))
}
