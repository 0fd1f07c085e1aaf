use crate::error::{RagError, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use std::fs;
use std::path::Path;

/// Page separator used by plain-text sources
const FORM_FEED: char = '\x0c';

/// One page of extracted text
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub text: String,
    /// 1-based page number within the source
    pub page_number: usize,
}

/// Represents a source document split into its pages
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// The document's file name
    pub source_id: String,
    /// The document's MIME type
    pub mime_type: String,
    pub pages: Vec<Page>,
}

impl SourceDocument {
    /// Load a document from a file path
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();

        if !path.is_file() {
            return Err(RagError::source_unavailable(path, "file not found"));
        }

        let source_id = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| RagError::source_unavailable(path, "invalid file name"))?
            .to_string();

        // Detect MIME type
        let mime = from_path(path).first_or_octet_stream();
        let mime_type = mime.to_string();
        debug!("Detected MIME type: {}", mime_type);

        let pages = read_pages(path, &mime_type)?;

        if pages.iter().all(|page| page.text.trim().is_empty()) {
            return Err(RagError::source_unavailable(path, "no extractable text"));
        }

        Ok(SourceDocument {
            source_id,
            mime_type,
            pages,
        })
    }

    /// Build a document from in-memory page texts
    pub fn from_pages<I, S>(source_id: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SourceDocument {
            source_id: source_id.into(),
            mime_type: "text/plain".to_string(),
            pages: number_pages(pages.into_iter().map(Into::into)),
        }
    }
}

/// Read the pages of a document based on its MIME type
pub fn read_pages<P: AsRef<Path>>(file_path: P, mime_type: &str) -> Result<Vec<Page>> {
    let path = file_path.as_ref();

    match mime_type {
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let pages = pdf_extract::extract_text_by_pages(path)
                .map_err(|e| RagError::source_unavailable(path, e))?;

            // PDF extraction can sometimes include excessive whitespace
            let pages = number_pages(pages.iter().map(|page| normalize_whitespace(page)));
            if pages.iter().all(|page| page.text.is_empty()) {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(pages)
        }

        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            let content =
                fs::read_to_string(path).map_err(|e| RagError::source_unavailable(path, e))?;
            Ok(number_pages(
                content.split(FORM_FEED).map(|page| page.to_string()),
            ))
        }

        _ => Err(RagError::source_unavailable(
            path,
            format!(
                "unsupported document format: {}. Only text and PDF files are supported.",
                mime_type
            ),
        )),
    }
}

fn number_pages(texts: impl Iterator<Item = String>) -> Vec<Page> {
    texts
        .enumerate()
        .map(|(idx, text)| Page {
            text,
            page_number: idx + 1,
        })
        .collect()
}

/// Collapse runs of spaces and cap blank lines at one paragraph break
fn normalize_whitespace(text: &str) -> String {
    let result = text.replace('\r', "");

    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(result.len());

    for c in result.chars() {
        if c == '\n' {
            newline_count += 1;
        } else {
            if newline_count > 0 {
                if newline_count >= 2 {
                    normalized.push_str("\n\n");
                } else {
                    normalized.push('\n');
                }
                newline_count = 0;
            }

            if !(c == ' ' && prev_char == ' ') {
                normalized.push(c);
            }

            prev_char = c;
        }
    }

    normalized.trim().to_string()
}
