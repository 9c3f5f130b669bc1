//! Error types for the text-to-PDF pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed inline markup in a single heading, paragraph or list item.
///
/// These are content errors: the offending unit is dropped and the rest of
/// the document still renders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InlineError {
    #[error("closing tag </{found}> does not match open <{expected}>")]
    MismatchedClose { expected: char, found: char },

    #[error("closing tag </{0}> has no matching open tag")]
    UnopenedClose(char),

    #[error("tag <{0}> is never closed")]
    Unclosed(char),
}

/// Fatal failures of a single render call.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The destination's parent directory did not exist and could not be created.
    #[error("Failed to create directory for PDF '{}': {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Typst compilation or PDF export failed.
    #[error("Error creating PDF ({stage} failed): {detail}")]
    Build { stage: &'static str, detail: String },

    #[error("Failed to write PDF '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RenderError {
    /// Short form of the message for end-user notices: the first line only.
    pub fn notice(&self) -> String {
        let message = self.to_string();
        message.lines().next().unwrap_or_default().to_string()
    }
}

/// Failures while turning an input file into dialect text.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Error reading '{}': {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
}

/// Failures inside a zipped Office document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("missing document part {0}")]
    MissingPart(String),
}

/// Failures of the text-generation service.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused. Is the generation server running at {0}?")]
    Connect(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Error parsing JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected response format or no content in response")]
    EmptyContent,
}
