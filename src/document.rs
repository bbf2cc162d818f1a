use anyhow::Context;
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text;
use std::fs;
use std::path::Path;

use crate::error::EngineError;

/// Raw document text plus the metadata needed to load it.
#[derive(Debug, Clone)]
pub struct Document {
    /// The full text content of the document.
    pub content: String,
    /// The document's detected MIME type.
    pub mime_type: String,
}

impl Document {
    /// Load a CV document from a file path.
    ///
    /// Markdown and plain text are read directly; PDFs go through text
    /// extraction. Startup-fatal failures map onto the `EngineError`
    /// taxonomy so the caller can distinguish a missing file from an
    /// unreadable one.
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, EngineError> {
        let path = file_path.as_ref();

        if !path.exists() {
            return Err(EngineError::NotFound {
                path: path.to_path_buf(),
            });
        }

        // Detect MIME type from the extension
        let mime_type = from_path(path).first_or_octet_stream().to_string();
        debug!("Detected MIME type: {}", mime_type);

        let content = read_document_content(path, &mime_type)?;

        Ok(Document { content, mime_type })
    }
}

/// Read content from a document based on its MIME type.
fn read_document_content(path: &Path, mime_type: &str) -> Result<String, EngineError> {
    match mime_type {
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let content = extract_text(path)
                .with_context(|| format!("failed to extract text from PDF: {}", path.display()))
                .map_err(|source| EngineError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

            // PDF extraction can leave excessive whitespace behind
            let cleaned = normalize_whitespace(&content);
            if cleaned.is_empty() {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }
            Ok(cleaned)
        }

        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            fs::read_to_string(path)
                .with_context(|| format!("failed to read text file: {}", path.display()))
                .map_err(|source| EngineError::Read {
                    path: path.to_path_buf(),
                    source,
                })
        }

        other => Err(EngineError::UnsupportedFormat {
            mime: other.to_string(),
        }),
    }
}

/// Collapse runs of spaces, normalize line endings, and cap consecutive
/// newlines at a single paragraph break.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace('\r', "");

    let mut normalized = String::with_capacity(text.len());
    let mut prev_char = ' ';
    let mut pending_newlines = 0;

    for c in text.chars() {
        if c == '\n' {
            pending_newlines += 1;
            continue;
        }

        if pending_newlines > 0 {
            // At most two newlines (one paragraph break)
            normalized.push_str(if pending_newlines >= 2 { "\n\n" } else { "\n" });
            pending_newlines = 0;
            prev_char = '\n';
        }

        if c == ' ' && prev_char == ' ' {
            continue;
        }
        normalized.push(c);
        prev_char = c;
    }

    if pending_newlines > 0 {
        normalized.push_str(if pending_newlines >= 2 { "\n\n" } else { "\n" });
    }

    normalized.trim().to_string()
}
