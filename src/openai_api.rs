//! Chat completions integration for project field extraction

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::settings::AppConfig;

pub const NOT_SPECIFIED: &str = "Not specified";
pub const MAX_PROMPT_CHARS: usize = 6000;
const TEMPERATURE: f32 = 0.0;

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// The four fields pulled out of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResult {
    pub industry: String,
    pub location: String,
    pub objectives: String,
    pub results_delivered: String,
}

impl FieldResult {
    pub fn not_specified() -> Self {
        Self {
            industry: NOT_SPECIFIED.to_string(),
            location: NOT_SPECIFIED.to_string(),
            objectives: NOT_SPECIFIED.to_string(),
            results_delivered: NOT_SPECIFIED.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("empty reply")]
    EmptyReply,
    #[error("reply is not JSON: {0}")]
    InvalidJson(String),
    #[error("reply JSON is not an object")]
    NotAnObject,
}

/// First `MAX_PROMPT_CHARS` characters; the rest is dropped.
pub fn truncate_chars(text: &str) -> &str {
    match text.char_indices().nth(MAX_PROMPT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(text: &str) -> String {
    format!(
        r#"
You are a management consulting analyst.

From the text below, extract ONLY the following fields.
Return STRICT JSON.

Fields:
- industry
- location
- objectives
- results_delivered

Rules:
- Be concise
- If not clear, infer professionally
- Do not add extra text

TEXT:
{}
"#,
        truncate_chars(text)
    )
}

/// Extract the four fields. Never fails: any request or parse problem
/// yields the "Not specified" record.
pub async fn extract_fields(config: &AppConfig, text: &str) -> FieldResult {
    match request_fields(config, text).await {
        Ok(fields) => fields,
        Err(e) => {
            warn!("Field extraction fell back to defaults: {}", e);
            FieldResult::not_specified()
        }
    }
}

pub async fn request_fields(config: &AppConfig, text: &str) -> Result<FieldResult, FieldError> {
    let request = ApiRequest {
        model: config.model.clone(),
        messages: vec![Message {
            role: "user".to_string(),
            content: build_prompt(text),
        }],
        temperature: TEMPERATURE,
    };

    debug!("Sending {} chars to {}", truncate_chars(text).chars().count(), config.model);

    let response = config
        .http
        .post(format!("{}/chat/completions", config.api_base_url))
        .bearer_auth(config.api_key())
        .json(&request)
        .send()
        .await
        .map_err(|e| FieldError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(FieldError::Api { status, body });
    }

    let api_response: ApiResponse = response
        .json()
        .await
        .map_err(|e| FieldError::Transport(format!("Failed to parse response: {}", e)))?;

    let reply = api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(FieldError::EmptyReply)?;

    parse_fields(&reply)
}

/// Parse the model's reply as a JSON object. One surrounding code fence is
/// tolerated; any other text around the object makes it invalid. Missing or
/// null keys fall back to "Not specified" individually.
pub fn parse_fields(reply: &str) -> Result<FieldResult, FieldError> {
    let json_str = strip_fence(reply.trim());

    let parsed: Value =
        serde_json::from_str(json_str).map_err(|e| FieldError::InvalidJson(e.to_string()))?;
    let object = parsed.as_object().ok_or(FieldError::NotAnObject)?;

    Ok(FieldResult {
        industry: field_text(object, "industry"),
        location: field_text(object, "location"),
        objectives: field_text(object, "objectives"),
        results_delivered: field_text(object, "results_delivered"),
    })
}

fn strip_fence(reply: &str) -> &str {
    let Some(inner) = reply
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return reply;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

fn field_text(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => NOT_SPECIFIED.to_string(),
        Some(value) => value_text(value),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_text)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
