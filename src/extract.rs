//! Text extraction for resources.
//!
//! Given a locator, returns the plain-text content behind it: UTF-8 text
//! files as-is, PDF via `pdf-extract`, DOCX by walking the document XML,
//! and web pages fetched over HTTP and reduced to their visible text.
//! Extraction failures are local to one resource: the engine logs them and
//! moves on to siblings.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::locator::ResourceLocator;

/// HTTP timeout for web-page fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Text extraction failure, local to one resource.
#[derive(Debug)]
pub enum ExtractError {
    Io(String),
    Http(String),
    Pdf(String),
    Docx(String),
    Markup(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Http(e) => write!(f, "fetch failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
            ExtractError::Markup(e) => write!(f, "markup extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the plain-text content behind `locator`.
pub async fn extract_text(locator: &ResourceLocator) -> Result<String, ExtractError> {
    match locator.path() {
        None => extract_web(locator.as_str()).await,
        Some(path) => extract_file(path),
    }
}

fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => extract_pdf(path),
        "docx" => extract_docx(path),
        "html" | "htm" => {
            let raw = std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))?;
            Ok(markup_to_text(&raw))
        }
        _ => std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string())),
    }
}

async fn extract_web(address: &str) -> Result<String, ExtractError> {
    // Bare `www.` locators carry no scheme.
    let url = if address.starts_with("www") {
        format!("https://{}", address)
    } else {
        address.to_string()
    };

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| ExtractError::Http(e.to_string()))?;
    let response = client
        .get(&url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| ExtractError::Http(e.to_string()))?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = response
        .text()
        .await
        .map_err(|e| ExtractError::Http(e.to_string()))?;

    if content_type.contains("text/html") || looks_like_html(&body) {
        Ok(markup_to_text(&body))
    } else {
        Ok(body)
    }
}

fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start();
    head.starts_with("<!DOCTYPE") || head.starts_with("<!doctype") || head.starts_with("<html")
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut document_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut document_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if document_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    docx_body_text(&document_xml)
}

/// Collect the text runs (`w:t`) of a DOCX document body, inserting a line
/// break at each paragraph end.
fn docx_body_text(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    // No whitespace trimming: spaces inside text runs are significant.
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Text(t)) if in_text_run => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if !out.ends_with('\n') && !out.is_empty() {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Markup(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Reduce HTML-ish markup to its visible text.
///
/// Real-world pages are rarely well-formed XML, so the walk is tolerant:
/// end-tag mismatches are ignored and a hard parse error ends the walk with
/// whatever text was gathered up to that point. Script and style bodies are
/// skipped.
pub fn markup_to_text(markup: &str) -> String {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(markup.as_bytes());
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if matches!(name.as_ref(), b"script" | b"style") {
                    skip_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if matches!(name.as_ref(), b"script" | b"style") {
                    skip_depth = skip_depth.saturating_sub(1);
                }
            }
            Ok(Event::Text(t)) if skip_depth == 0 => {
                let text = t.unescape().unwrap_or_default();
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(trimmed);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_file_is_read_verbatim() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("notes.txt");
        std::fs::write(&file, "hello world").unwrap();

        let locator = ResourceLocator::from(file.as_path());
        let text = extract_text(&locator).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let locator = ResourceLocator::new("/definitely/not/here.txt");
        let err = extract_text(&locator).await.unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    #[test]
    fn invalid_pdf_is_a_pdf_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("bad.pdf");
        std::fs::write(&file, "not a pdf").unwrap();
        let err = extract_file(&file).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_docx_is_a_docx_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("bad.docx");
        std::fs::write(&file, "not a zip").unwrap();
        let err = extract_file(&file).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn markup_text_is_extracted_without_tags() {
        let html = "<html><head><style>body { color: red }</style></head>\
                    <body><h1>Title</h1><p>First &amp; second.</p>\
                    <script>var x = 1;</script></body></html>";
        let text = markup_to_text(html);
        assert!(text.contains("Title"));
        assert!(text.contains("First & second."));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn html_file_extension_is_stripped_of_markup() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("page.html");
        std::fs::write(&file, "<p>visible</p>").unwrap();
        let text = extract_file(&file).unwrap();
        assert_eq!(text, "visible");
    }

    #[test]
    fn docx_body_text_joins_runs_and_paragraphs() {
        let xml = br#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>
                <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
              </w:body>
            </w:document>"#;
        let text = docx_body_text(xml).unwrap();
        assert_eq!(text, "Hello world\nSecond paragraph\n");
    }
}
