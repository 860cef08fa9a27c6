use crate::retention::PendingDeletion;
use crate::server::AppContext;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub fn files_routes() -> Router<AppContext> {
    Router::new().route("/files", get(list_files))
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// When the sweep will consider the file expired
    pub expires_at: Option<DateTime<Utc>>,
    pub watch_url: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileEntry>,
    pub pending_deletions: Vec<PendingDeletion>,
}

async fn list_files(State(ctx): State<AppContext>) -> impl IntoResponse {
    let files = match ctx.store.list().await {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list stored files");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let ttl = chrono::Duration::from_std(ctx.scheduler.policy().ttl).ok();
    let files = files
        .into_iter()
        .filter(|f| !f.is_partial())
        .map(|f| FileEntry {
            expires_at: ttl.and_then(|ttl| f.modified.checked_add_signed(ttl)),
            watch_url: crate::acquisition::site_path("watch", &f.filename),
            download_url: crate::acquisition::site_path("downloads", &f.filename),
            filename: f.filename,
            size: f.size,
            modified: f.modified,
        })
        .collect();

    Json(FilesResponse {
        files,
        pending_deletions: ctx.scheduler.pending(),
    })
    .into_response()
}
