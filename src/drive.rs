//! Public Drive folder access: folder id parsing, listing and downloads.
//!
//! Nothing here authenticates. A private folder looks exactly like an empty one.

use std::collections::HashSet;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AppError, AppResult};
use crate::settings::AppConfig;

const FOLDER_ID_PATTERN: &str = r"folders/([a-zA-Z0-9_-]+)";
const FILE_LINK_MARKER: &str = "/file/d/";

static FOLDER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(FOLDER_ID_PATTERN).expect("valid folder id pattern"));

/// One file anchor found on a folder page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DriveFileRef {
    pub name: String,
    pub id: String,
}

/// Returns the token following `folders/`, if any.
pub fn extract_folder_id(url: &str) -> Option<String> {
    FOLDER_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn folder_url(base: &str, folder_id: &str) -> String {
    format!("{}/drive/folders/{}", base, folder_id)
}

pub fn download_url(base: &str, file_id: &str) -> String {
    format!("{}/uc?id={}", base, file_id)
}

/// Scan folder page markup for file anchors.
///
/// Order is first occurrence in the document; a repeated (name, id) pair is
/// kept once, but the same id under a different name is a separate entry.
pub fn parse_listing(html: &str) -> AppResult<Vec<DriveFileRef>> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").map_err(|e| AppError::Html(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(id) = file_id_from_href(href) else {
            continue;
        };
        let name = anchor.text().collect::<String>().trim().to_string();
        let file = DriveFileRef { name, id };
        if seen.insert(file.clone()) {
            files.push(file);
        }
    }

    Ok(files)
}

fn file_id_from_href(href: &str) -> Option<String> {
    let (_, rest) = href.split_once(FILE_LINK_MARKER)?;
    let id = rest.split(['/', '?', '#']).next().unwrap_or("");
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Fetch the public folder page and list its files.
pub async fn list_files(config: &AppConfig, folder_id: &str) -> AppResult<Vec<DriveFileRef>> {
    let url = folder_url(&config.drive_base_url, folder_id);
    info!("Fetching folder listing: {}", url);

    let response = config.http.get(&url).send().await?;
    debug!("Folder listing status {}", response.status());
    let html = response.text().await?;

    let files = parse_listing(&html)?;
    info!("Found {} file link(s) in folder {}", files.len(), folder_id);
    Ok(files)
}

/// Download a file body. The status code is not inspected; whatever the
/// server sent back is returned as-is.
pub async fn fetch_file(config: &AppConfig, file_id: &str) -> AppResult<Vec<u8>> {
    let url = download_url(&config.drive_base_url, file_id);
    let response = config.http.get(&url).send().await?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}
