use std::sync::Arc;

use log::{error, info};
use serde::Serialize;

use crate::drive::{extract_folder_id, fetch_file, list_files, DriveFileRef};
use crate::error::AppResult;
use crate::openai_api::{extract_fields, FieldResult};
use crate::settings::AppConfig;
use crate::text_extract::extract_text;

pub const INVALID_LINK_MESSAGE: &str = "Invalid Google Drive folder link";
pub const EMPTY_MESSAGE: &str = "No readable files found";

/// One table row, keyed by its display column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    #[serde(rename = "Industry")]
    pub industry: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Objectives")]
    pub objectives: String,
    #[serde(rename = "Results Delivered")]
    pub results_delivered: String,
}

impl ResultRow {
    pub const COLUMNS: [&'static str; 4] =
        ["Industry", "Location", "Objectives", "Results Delivered"];

    pub fn cells(&self) -> [&str; 4] {
        [
            self.industry.as_str(),
            self.location.as_str(),
            self.objectives.as_str(),
            self.results_delivered.as_str(),
        ]
    }
}

impl From<FieldResult> for ResultRow {
    fn from(fields: FieldResult) -> Self {
        Self {
            industry: fields.industry,
            location: fields.location,
            objectives: fields.objectives,
            results_delivered: fields.results_delivered,
        }
    }
}

/// How a run ended when it did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    InvalidLink,
    Empty,
    Table(Vec<ResultRow>),
}

pub struct Pipeline {
    config: Arc<AppConfig>,
}

impl Pipeline {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// Resolve the folder, then fetch, read and analyze each file in turn.
    ///
    /// Transport and decoder failures abort the whole run; no partial rows
    /// are returned.
    pub async fn run(&self, link: &str) -> AppResult<RunOutcome> {
        let Some(folder_id) = extract_folder_id(link) else {
            info!("Rejected folder link: {}", link);
            return Ok(RunOutcome::InvalidLink);
        };

        info!("=== Run started for folder {} ===", folder_id);

        let result = self.process_folder(&folder_id).await;
        match &result {
            Ok(RunOutcome::Table(rows)) => info!("Run finished with {} row(s)", rows.len()),
            Ok(_) => info!("Run finished without readable files"),
            Err(e) => error!("Run for folder {} failed: {}", folder_id, e),
        }
        result
    }

    async fn process_folder(&self, folder_id: &str) -> AppResult<RunOutcome> {
        let files = list_files(&self.config, folder_id).await?;
        if files.is_empty() {
            return Ok(RunOutcome::Empty);
        }

        let mut rows = Vec::new();
        for file in files {
            if let Some(row) = self.process_file(&file).await? {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            Ok(RunOutcome::Empty)
        } else {
            Ok(RunOutcome::Table(rows))
        }
    }

    async fn process_file(&self, file: &DriveFileRef) -> AppResult<Option<ResultRow>> {
        let content = fetch_file(&self.config, &file.id).await?;
        info!("Fetched {} ({} bytes)", file.name, content.len());

        let name = file.name.clone();
        let text = tokio::task::spawn_blocking(move || extract_text(&name, &content)).await??;

        if text.trim().is_empty() {
            info!("No readable text in {}, skipping", file.name);
            return Ok(None);
        }

        let fields = extract_fields(&self.config, &text).await;
        Ok(Some(ResultRow::from(fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::openai_api::NOT_SPECIFIED;
    use crate::test_support::{spawn_stub, stub_config};
    use crate::text_extract::fixtures::{docx_with_paragraphs, pdf_with_pages};
    use axum::{
        extract::Query,
        response::{Html, IntoResponse},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Folder page with the given anchors; `/uc?id=` serves `bodies[id]`.
    fn drive_stub(anchors: &'static str, bodies: HashMap<String, Vec<u8>>) -> Router {
        let bodies = Arc::new(bodies);
        Router::new()
            .route("/drive/folders/:id", get(move || async move { Html(anchors) }))
            .route(
                "/uc",
                get(move |Query(q): Query<HashMap<String, String>>| {
                    let bodies = Arc::clone(&bodies);
                    async move {
                        let id = q.get("id").cloned().unwrap_or_default();
                        bodies
                            .get(&id)
                            .cloned()
                            .unwrap_or_else(|| b"<html>not found</html>".to_vec())
                            .into_response()
                    }
                }),
            )
    }

    fn chat_stub(reply: &'static str, calls: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/chat/completions",
            post(move |Json(_body): Json<Value>| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({
                        "choices": [{ "message": { "role": "assistant", "content": reply } }]
                    }))
                }
            }),
        )
    }

    const RETAIL_REPLY: &str = r#"{"industry":"Retail","location":"Mumbai","objectives":"Expand","results_delivered":"New stores"}"#;

    async fn pipeline_with(drive: Router, chat: Router) -> Pipeline {
        let drive_base = spawn_stub(drive).await;
        let api_base = spawn_stub(chat).await;
        Pipeline::new(Arc::new(stub_config(&drive_base, &api_base)))
    }

    #[tokio::test]
    async fn bad_link_makes_no_calls() {
        // Nothing listens here; any network call would surface as an error.
        let pipeline = Pipeline::new(Arc::new(stub_config(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
        )));
        let outcome = pipeline.run("not-a-drive-url").await.unwrap();
        assert_eq!(outcome, RunOutcome::InvalidLink);
    }

    #[tokio::test]
    async fn empty_folder_is_empty_outcome() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline_with(
            drive_stub("<html><body><p>Nothing shared</p></body></html>", HashMap::new()),
            chat_stub(RETAIL_REPLY, calls.clone()),
        )
        .await;

        let outcome = pipeline
            .run("https://drive.google.com/drive/folders/empty")
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Empty);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_pdf_gives_one_row() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bodies = HashMap::new();
        bodies.insert(
            "pdf1".to_string(),
            pdf_with_pages(&["Acme Corp operates in retail"]),
        );
        let pipeline = pipeline_with(
            drive_stub(r#"<a href="/file/d/pdf1/view">Acme.pdf</a>"#, bodies),
            chat_stub(RETAIL_REPLY, calls.clone()),
        )
        .await;

        let outcome = pipeline
            .run("https://drive.google.com/drive/folders/abc")
            .await
            .unwrap();
        let RunOutcome::Table(rows) = outcome else {
            panic!("expected a table");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].industry, "Retail");
        assert_eq!(rows[0].results_delivered, "New stores");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreadable_files_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bodies = HashMap::new();
        bodies.insert("img".to_string(), b"\x89PNG\r\n".to_vec());
        bodies.insert("blank".to_string(), b"   \n\t ".to_vec());
        // "gone" is not served, so its download is an HTML error page.
        let pipeline = pipeline_with(
            drive_stub(
                r#"<a href="/file/d/img/view">photo.png</a>
                   <a href="/file/d/blank/view">blank.txt</a>
                   <a href="/file/d/gone/view">lost.pdf</a>"#,
                bodies,
            ),
            chat_stub(RETAIL_REPLY, calls.clone()),
        )
        .await;

        let outcome = pipeline
            .run("https://drive.google.com/drive/folders/abc")
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Empty);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rows_follow_listing_order_and_fallback_continues() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bodies = HashMap::new();
        bodies.insert("t1".to_string(), b"first project".to_vec());
        bodies.insert(
            "d1".to_string(),
            docx_with_paragraphs(&["second", "project"]),
        );
        let pipeline = pipeline_with(
            drive_stub(
                r#"<a href="/file/d/t1/view">a.txt</a>
                   <a href="/file/d/t1/view">a.txt</a>
                   <a href="/file/d/d1/view">b.DOCX</a>"#,
                bodies,
            ),
            chat_stub("not json at all", calls.clone()),
        )
        .await;

        let outcome = pipeline
            .run("https://drive.google.com/drive/folders/abc")
            .await
            .unwrap();
        let RunOutcome::Table(rows) = outcome else {
            panic!("expected a table");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.industry == NOT_SPECIFIED));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn corrupt_document_aborts_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bodies = HashMap::new();
        bodies.insert("ok".to_string(), b"readable".to_vec());
        bodies.insert("bad".to_string(), b"PK\x03\x04garbage".to_vec());
        let pipeline = pipeline_with(
            drive_stub(
                r#"<a href="/file/d/ok/view">ok.txt</a>
                   <a href="/file/d/bad/view">bad.docx</a>"#,
                bodies,
            ),
            chat_stub(RETAIL_REPLY, calls.clone()),
        )
        .await;

        let result = pipeline
            .run("https://drive.google.com/drive/folders/abc")
            .await;
        assert!(matches!(result, Err(AppError::Docx(_))));
        // ok.txt was analyzed before bad.docx aborted the run.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_drive_aborts_run() {
        let pipeline = Pipeline::new(Arc::new(stub_config(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
        )));
        let result = pipeline
            .run("https://drive.google.com/drive/folders/abc")
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn row_serializes_with_display_keys() {
        let row = ResultRow::from(FieldResult::not_specified());
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Results Delivered"], NOT_SPECIFIED);
        assert_eq!(json.as_object().unwrap().len(), 4);
    }
}
