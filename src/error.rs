use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort engine construction.
///
/// Only startup failures live here. Query-time conditions (no result above
/// the relevance threshold, an unknown section filter) are normal outcomes
/// and are expressed as empty result sets or sentinel strings instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The source CV file does not exist.
    #[error("CV file not found at {}", .path.display())]
    NotFound { path: PathBuf },

    /// The source CV file exists but could not be read or decoded.
    #[error("failed to read CV file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The source file has a MIME type the loader does not handle.
    #[error("unsupported document format {mime}: only text and PDF files are supported")]
    UnsupportedFormat { mime: String },

    /// Parsing and chunking produced zero usable chunks, so no query can
    /// ever be served. Signals a malformed or empty source document.
    #[error("CV produced no indexable chunks")]
    EmptyCorpus,
}
