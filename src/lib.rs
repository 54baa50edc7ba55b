//! # edgequake-pdfbatch
//!
//! Batch-convert folders of PDF documents into self-contained Markdown files,
//! with vision-model captions for every embedded image.
//!
//! ## How a run is organised
//!
//! Each immediate subdirectory of the import root is one document set and
//! becomes one timestamped Markdown file. Loose PDFs directly under the import
//! root form a *root group* written to `combined_documents.md`. Every run ends
//! with a `processing_summary_{unix}.md` report.
//!
//! ```text
//! imports/                         exports/
//!  ├─ loose.pdf          ──▶        ├─ combined_documents.md
//!  ├─ Q1 Reports/                   ├─ Q1_Reports_2024-03-01_09-30-00.md
//!  │   ├─ jan.pdf        ──▶        │
//!  │   └─ feb.pdf                   │
//!  └─ empty/             (skipped)  └─ processing_summary_1709285400.md
//! ```
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder
//!  │
//!  ├─ 1. Discover  subdirectories + root group, lexical order
//!  ├─ 2. Extract   text and images per page via pdfium
//!  ├─ 3. Caption   one VLM call per image (gpt-4.1-nano / claude / gemini / …)
//!  ├─ 4. Render    heading, metadata, page text, base64-inlined images
//!  └─ 5. Write     header + table of contents + sections, then the summary
//! ```
//!
//! A bad PDF fails only its own entry; a failed caption leaves only that
//! image without alt text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfbatch::{BatchConfig, Orchestrator, PdfiumExtractor, VlmCaptioner};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = BatchConfig::default();
//!     let captioner = VlmCaptioner::from_config(&config)?;
//!     let summary = Orchestrator::new(config, Box::new(PdfiumExtractor::new()?))
//!         .with_captioner(Box::new(captioner))
//!         .run()?;
//!     eprintln!("{} output file(s), {} pages",
//!         summary.output_files_written(),
//!         summary.total_pages());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfbatch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfbatch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod summary;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BatchConfig, BatchConfigBuilder, ImageHandling, PageSeparator};
pub use error::{BatchError, CaptionError, ExtractionError, WriteError};
pub use orchestrator::{Orchestrator, ProcessedFolder};
pub use output::{
    ConversionResult, DocumentInfo, ExtractedDocument, ExtractedImage, FileOutcome, FolderKind,
    FolderOutput, FolderReport, ImageFormat, ImportFolder, Page, RunSummary, ROOT_FOLDER_NAME,
};
pub use pipeline::caption::{Captioner, VlmCaptioner};
pub use pipeline::extract::{Extractor, PdfiumExtractor};
pub use pipeline::render::{DocumentRenderer, MarkdownSection};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use validate::{validate_configuration, ValidationReport};
