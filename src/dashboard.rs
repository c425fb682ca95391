//! Web dashboard: one input for the folder link, results rendered as a table.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::error::{AppError, AppResult};
use crate::pipeline::{Pipeline, ResultRow, RunOutcome, EMPTY_MESSAGE, INVALID_LINK_MESSAGE};
use crate::settings::AppConfig;

const LINK_PLACEHOLDER: &str = "https://drive.google.com/drive/folders/XXXXXXXX";
const TABLE_HEADING: &str = "AI-Extracted Project Summary";

#[derive(Clone)]
pub struct DashboardState {
    pipeline: Arc<Pipeline>,
    page_title: Arc<str>,
}

impl DashboardState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            page_title: Arc::from(config.page_title.as_str()),
            pipeline: Arc::new(Pipeline::new(config)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub link: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzeResponse {
    Table {
        rows: Vec<ResultRow>,
        generated_at: String,
    },
    Empty {
        message: String,
    },
    InvalidLink {
        message: String,
    },
    Error {
        message: String,
    },
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/analyze", post(analyze))
        .route("/api/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: Arc<AppConfig>) -> AppResult<()> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    let addr = listener.local_addr()?;
    info!("Dashboard listening on http://{}", addr);

    let app = router(DashboardState::new(config));
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}

async fn index(State(state): State<DashboardState>, Query(query): Query<AnalyzeQuery>) -> Response {
    let link = query.link.unwrap_or_default();
    if link.trim().is_empty() {
        return Html(render_page(&state.page_title, "", "")).into_response();
    }

    match state.pipeline.run(link.trim()).await {
        Ok(outcome) => Html(render_page(&state.page_title, &link, &render_outcome(&outcome)))
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render_page(&state.page_title, &link, &render_failure(&e))),
        )
            .into_response(),
    }
}

async fn analyze(
    State(state): State<DashboardState>,
    Json(request): Json<AnalyzeRequest>,
) -> (StatusCode, Json<AnalyzeResponse>) {
    match state.pipeline.run(request.link.trim()).await {
        Ok(RunOutcome::Table(rows)) => (
            StatusCode::OK,
            Json(AnalyzeResponse::Table {
                rows,
                generated_at: timestamp(),
            }),
        ),
        Ok(RunOutcome::Empty) => (
            StatusCode::OK,
            Json(AnalyzeResponse::Empty {
                message: EMPTY_MESSAGE.to_string(),
            }),
        ),
        Ok(RunOutcome::InvalidLink) => (
            StatusCode::BAD_REQUEST,
            Json(AnalyzeResponse::InvalidLink {
                message: INVALID_LINK_MESSAGE.to_string(),
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AnalyzeResponse::Error {
                message: e.to_string(),
            }),
        ),
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
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

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::InvalidLink => notice("error", INVALID_LINK_MESSAGE),
        RunOutcome::Empty => notice("warning", EMPTY_MESSAGE),
        RunOutcome::Table(rows) => render_table(rows),
    }
}

fn render_failure(error: &AppError) -> String {
    notice("error", &format!("Analysis failed: {}", error))
}

fn notice(class: &str, message: &str) -> String {
    format!(
        "<div class=\"notice {}\">{}</div>",
        class,
        escape_html(message)
    )
}

pub fn render_table(rows: &[ResultRow]) -> String {
    let mut html = format!("<h3>{}</h3>\n<table>\n<thead><tr>", TABLE_HEADING);
    for column in ResultRow::COLUMNS {
        html.push_str(&format!("<th>{}</th>", column));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row.cells() {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html.push_str(&format!("<p class=\"caption\">Generated {}</p>", timestamp()));
    html
}

fn render_page(title: &str, link: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem auto; max-width: 72rem; padding: 0 1rem; }}
input[type=text] {{ width: 100%; padding: .5rem; box-sizing: border-box; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #ccc; padding: .5rem; text-align: left; vertical-align: top; }}
.notice {{ padding: .75rem; margin: 1rem 0; border-radius: 4px; }}
.error {{ background: #fde2e2; }}
.warning {{ background: #fff4d6; }}
.caption {{ color: #777; font-size: .85rem; }}
</style>
</head>
<body>
<h2>{title}</h2>
<p class="caption">LLM-powered extraction from Google Drive files</p>
<hr>
<form method="get" action="/">
<label for="link">Paste Google Drive public folder link</label>
<input type="text" id="link" name="link" value="{link}" placeholder="{placeholder}">
</form>
{body}
<hr>
<p class="caption">{title}</p>
</body>
</html>
"#,
        title = title,
        link = escape_html(link),
        placeholder = LINK_PLACEHOLDER,
        body = body,
    )
}
