//! Progress-callback trait for per-folder and per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to follow a run as
//! it happens. The CLI uses this to drive its progress bar; library callers
//! can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfbatch::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     files: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, name: &str, pages: usize, images: usize) {
//!         let done = self.files.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{} {} ({} pages, {} images)", done, name, pages, images);
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { files: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::FolderReport;
use std::sync::Arc;

/// Called by the orchestrator as it works through folders and files.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in order from a single thread.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before any folder is processed.
    ///
    /// # Arguments
    /// * `folders`     — number of folders that will be processed
    /// * `total_files` — PDF files across all of them
    fn on_run_start(&self, folders: usize, total_files: usize) {
        let _ = (folders, total_files);
    }

    /// Called before the first file of a folder.
    fn on_folder_start(&self, name: &str, files: usize) {
        let _ = (name, files);
    }

    /// Called when a file has been extracted, captioned and rendered.
    fn on_file_complete(&self, name: &str, pages: usize, images: usize) {
        let _ = (name, pages, images);
    }

    /// Called when a file fails; the folder carries on.
    fn on_file_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called after the folder's output has been written (or not).
    fn on_folder_complete(&self, report: &FolderReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
