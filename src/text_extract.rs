//! Plain text extraction for downloaded documents (PDF, DOCX, TXT)

use std::io::{Cursor, Read};

use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{AppError, AppResult};

const PDF_SIGNATURE: &[u8] = b"%PDF";
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
// Readers accept the PDF header anywhere in the first 1024 bytes.
const PDF_HEADER_WINDOW: usize = 1024;
const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Case-insensitive extension sniffing on the display name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Some(Self::Docx)
        } else if lower.ends_with(".txt") {
            Some(Self::Text)
        } else {
            None
        }
    }

    fn signature_matches(self, bytes: &[u8]) -> bool {
        match self {
            Self::Pdf => bytes[..bytes.len().min(PDF_HEADER_WINDOW)]
                .windows(PDF_SIGNATURE.len())
                .any(|w| w == PDF_SIGNATURE),
            Self::Docx => bytes.starts_with(ZIP_SIGNATURE),
            Self::Text => true,
        }
    }
}

/// Extract text from a downloaded file.
///
/// Unknown extensions, and PDF/DOCX bodies without the right signature
/// (such as an HTML interstitial), give an empty string. A body that has
/// the signature but fails to decode is an error.
pub fn extract_text(name: &str, bytes: &[u8]) -> AppResult<String> {
    let Some(kind) = DocumentKind::from_name(name) else {
        debug!("Unsupported file type: {}", name);
        return Ok(String::new());
    };

    if !kind.signature_matches(bytes) {
        debug!("{} does not look like a {:?} document, skipping", name, kind);
        return Ok(String::new());
    }

    match kind {
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Page texts joined by a single space, in page order.
pub fn extract_pdf(bytes: &[u8]) -> AppResult<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| AppError::Pdf(format!("Failed to extract text: {}", e)))?;
    Ok(pages.join(" "))
}

/// Paragraph texts joined by a single space, in document order.
pub fn extract_docx(bytes: &[u8]) -> AppResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::Docx(format!("Failed to open container: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| AppError::Docx(format!("{} missing: {}", DOCX_BODY, e)))?
        .read_to_string(&mut xml)?;

    let paragraphs = docx_paragraphs(&xml)?;
    Ok(paragraphs.join(" "))
}

fn docx_paragraphs(xml: &str) -> AppResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    // Indexes into `paragraphs` of the open <w:p> elements, innermost last.
    // Text boxes nest paragraphs inside paragraphs.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| AppError::Docx(format!("Malformed {}: {}", DOCX_BODY, e)))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                // <w:p/> is a blank paragraph
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => push_to(&mut paragraphs, &open, "\t"),
                b"w:br" | b"w:cr" => push_to(&mut paragraphs, &open, "\n"),
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| AppError::Docx(format!("Bad text run: {}", e)))?;
                push_to(&mut paragraphs, &open, &text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    open.pop();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_to(paragraphs: &mut [String], open: &[usize], text: &str) {
    if let Some(paragraph) = open.last().and_then(|&i| paragraphs.get_mut(i)) {
        paragraph.push_str(text);
    }
}
