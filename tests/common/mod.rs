//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temporary storage directory and a
//! full [`AppContext`] pointing at it.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use vidrelay::config::Config;
use vidrelay::server::{create_router, AppContext};

pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Build a harness; `storage.dir` is always replaced by a fresh temp dir.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage.dir = dir.path().to_path_buf();
        let ctx = AppContext::new(config);
        Self { ctx, dir }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Write a file straight into the storage directory.
    pub fn put_file(&self, name: &str, data: &[u8]) {
        std::fs::write(self.dir.path().join(name), data).expect("failed to write test file");
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.expect("request failed")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }
}

/// 1000 bytes with a position-dependent pattern.
pub fn clip_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
