//! Homepage form and the link submission handler.

use crate::server::AppContext;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use vidrelay_common::Error;

pub fn home_routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(home))
        .route("/download", post(submit_download))
}

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    pub url: String,
}

const FORM: &str = r#"<form method="post" action="/download">
  <input type="url" name="url" placeholder="Paste a video link" required autofocus>
  <button type="submit">Download</button>
</form>"#;

async fn home(State(ctx): State<AppContext>) -> Html<String> {
    let hours = ctx.config.storage.ttl_hours;
    page(
        "vidrelay",
        &format!("{FORM}\n<p>Files are deleted {hours} hours after download.</p>"),
    )
}

async fn submit_download(
    State(ctx): State<AppContext>,
    Form(form): Form<DownloadForm>,
) -> Response {
    match ctx.acquirer.acquire(&form.url).await {
        Ok(acquired) => {
            let title = if acquired.title.is_empty() {
                acquired.filename.as_str()
            } else {
                acquired.title.as_str()
            };
            let body = format!(
                r#"<h2>{title}</h2>
<video controls preload="metadata" src="{watch}"></video>
<p><a href="{watch}">Watch</a> | <a href="{download}" download>Download</a></p>
<p>Available for {hours} hours.</p>
<p><a href="/">Another link</a></p>"#,
                title = escape_html(title),
                watch = escape_html(&acquired.watch_path),
                download = escape_html(&acquired.download_path),
                hours = ctx.config.storage.ttl_hours,
            );
            page("Ready", &body).into_response()
        }
        Err(e) => {
            let status = match &e {
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Upstream(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                tracing::warn!(url = %form.url, error = %e, "Acquisition failed");
            } else {
                tracing::debug!(url = %form.url, error = %e, "Rejected submission");
            }
            let body = format!(
                "<p class=\"error\">{}</p>\n{FORM}",
                escape_html(&e.to_string())
            );
            (status, page("Download failed", &body)).into_response()
        }
    }
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    ))
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
