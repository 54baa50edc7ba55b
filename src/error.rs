//! Error types for the edgequake-pdfbatch library.
//!
//! Failures are split by the level at which the batch recovers from them:
//!
//! * [`BatchError`] — **Fatal**: the run cannot start at all (missing import
//!   root, export root not creatable, no PDF engine, no caption provider).
//!   Returned as `Err(BatchError)` from [`crate::orchestrator::Orchestrator::run`]
//!   and mapped to a non-zero exit code by the CLI.
//!
//! * [`ExtractionError`] — **Per file**: one PDF could not be read. Recorded
//!   in its [`crate::output::ConversionResult`]; the folder carries on.
//!
//! * [`CaptionError`] — **Per image**: the captioner rejected or failed on one
//!   image. Degrades to an empty caption for that image only.
//!
//! * [`WriteError`] — **Per folder**: a folder's Markdown file could not be
//!   written. Recorded in the folder's [`crate::output::FolderReport`].

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a run before any document is processed.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The import root does not exist.
    #[error("Import directory not found: '{path}'\nCreate it or pass --imports <PATH>.")]
    ImportRootMissing { path: PathBuf },

    /// The import root exists but is a file.
    #[error("Import path is not a directory: '{path}'")]
    ImportRootNotADirectory { path: PathBuf },

    /// The import root could not be listed.
    #[error("Failed to read import directory '{path}': {source}")]
    ImportRootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The export root could not be created.
    #[error("Cannot create export directory '{path}': {source}\nCheck permissions or pass --exports <PATH>.")]
    ExportRootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Collaborator setup errors ─────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide,\n\
or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases"
    )]
    PdfiumBindingFailed(String),

    /// The caption provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}\nPass --no-images to convert without captions.")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The run summary could not be written.
    #[error("Failed to write run summary '{path}': {source}")]
    SummaryWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// `true` for errors caused by bad paths or options rather than the
    /// environment's collaborators.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BatchError::ImportRootMissing { .. }
                | BatchError::ImportRootNotADirectory { .. }
                | BatchError::ImportRootUnreadable { .. }
                | BatchError::ExportRootUnavailable { .. }
                | BatchError::InvalidConfig(_)
        )
    }
}

/// A non-fatal error for a single PDF.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    #[error("file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file was read, but its header is not `%PDF`.
    #[error("not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("corrupt PDF: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("PDF is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    /// pdfium failed on one page; the whole file is reported as failed.
    #[error("page {page} could not be read: {detail}")]
    PageFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },
}

/// A non-fatal error for a single image caption.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum CaptionError {
    #[error("image {index} on page {page}: unsupported image format '{format}'")]
    UnsupportedFormat {
        page: usize,
        index: usize,
        format: String,
    },

    #[error("image {index} on page {page}: model returned an empty caption")]
    EmptyResponse { page: usize, index: usize },

    /// LLM call failed after retries.
    #[error("image {index} on page {page}: caption call failed after {retries} retries: {detail}")]
    LlmFailed {
        page: usize,
        index: usize,
        retries: u32,
        detail: String,
    },
}

/// A non-fatal error writing one folder's output.
#[derive(Debug, Error)]
#[error("Failed to write output file '{path}': {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
