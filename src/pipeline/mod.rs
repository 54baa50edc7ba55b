//! Pipeline stages for folder-batch PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and the two external collaborators (pdfium, the vision LLM) sit behind
//! traits the orchestrator can swap for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ extract ──▶ caption ──▶ render
//! (folders)    (pdfium)    (VLM)       (Markdown section)
//!                 │            ▲
//!                 └─ encode ───┘   postprocess is used by extract/render
//! ```
//!
//! 1. [`discover`] — list document folders and the root group
//! 2. [`extract`]  — pages, text and images from one PDF
//! 3. [`encode`]   — PNG bytes, base64 and `data:` URIs
//! 4. [`caption`]  — describe each image with retry/backoff; the only stage
//!    with network I/O
//! 5. [`render`]   — assemble one document's Markdown section
//! 6. [`postprocess`] — text cleanup, filenames, titles and anchors

pub mod caption;
pub mod discover;
pub mod encode;
pub mod extract;
pub mod postprocess;
pub mod render;
