//! Data model shared by the pipeline stages, the orchestrator and the reports.
//!
//! Extraction types ([`ExtractedDocument`], [`Page`], [`ExtractedImage`]) are
//! transient: a document lives only between extraction and rendering. Report
//! types ([`ConversionResult`], [`FolderReport`], [`RunSummary`]) accumulate
//! over the run and are `Serialize` so the CLI can emit them as JSON.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reserved identity for the synthetic group of loose PDFs under the import root.
pub const ROOT_FOLDER_NAME: &str = "_root";

// ── Discovery ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderKind {
    /// Loose PDFs directly under the import root.
    Root,
    /// An immediate subdirectory of the import root.
    Subdirectory,
}

/// One logical document set: a subdirectory, or the root group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFolder {
    /// Directory name, or [`ROOT_FOLDER_NAME`] for the root group.
    pub name: String,
    pub kind: FolderKind,
    pub path: PathBuf,
    /// PDF files in lexical filename order.
    pub files: Vec<PathBuf>,
}

impl ImportFolder {
    pub fn root(path: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            name: ROOT_FOLDER_NAME.to_string(),
            kind: FolderKind::Root,
            path: path.into(),
            files,
        }
    }

    pub fn subdirectory(name: impl Into<String>, path: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: FolderKind::Subdirectory,
            path: path.into(),
            files,
        }
    }

    pub fn is_root(&self) -> bool {
        self.kind == FolderKind::Root
    }

    /// Human-facing name used in headings and logs.
    pub fn display_name(&self) -> &str {
        match self.kind {
            FolderKind::Root => "Root Directory",
            FolderKind::Subdirectory => &self.name,
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Document information dictionary entries. All optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// Encoding of an extracted image's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// 1-based page number.
    pub page: usize,
    /// 0-based position on the page.
    pub index: usize,
    pub data: Vec<u8>,
    pub format: ImageFormat,
    /// Attached by the orchestrator. `None` and `Some("")` both mean "no caption".
    pub caption: Option<String>,
}

impl ExtractedImage {
    pub fn new(page: usize, index: usize, data: Vec<u8>, format: ImageFormat) -> Self {
        Self {
            page,
            index,
            data,
            format,
            caption: None,
        }
    }

    /// The caption text, if one is attached and non-blank.
    pub fn caption_text(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Extracted text; may be empty for scanned or image-only pages.
    pub text: String,
    pub images: Vec<ExtractedImage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub source: PathBuf,
    pub info: DocumentInfo,
    pub page_count: usize,
    pub pages: Vec<Page>,
}

impl ExtractedDocument {
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }

    pub fn images_mut(&mut self) -> impl Iterator<Item = &mut ExtractedImage> {
        self.pages.iter_mut().flat_map(|p| p.images.iter_mut())
    }
}

// ── Per-file results ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Converted {
        title: String,
        pages: usize,
        images: usize,
        /// Images that received a non-empty caption.
        captioned: usize,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub source: PathBuf,
    pub outcome: FileOutcome,
}

impl ConversionResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, FileOutcome::Converted { .. })
    }

    /// Source filename for display, falling back to the full path.
    pub fn file_name(&self) -> String {
        file_name_of(&self.source)
    }

    pub fn pages(&self) -> usize {
        match self.outcome {
            FileOutcome::Converted { pages, .. } => pages,
            FileOutcome::Failed { .. } => 0,
        }
    }

    pub fn images(&self) -> usize {
        match self.outcome {
            FileOutcome::Converted { images, .. } => images,
            FileOutcome::Failed { .. } => 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            FileOutcome::Failed { error } => Some(error),
            FileOutcome::Converted { .. } => None,
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Per-folder report ────────────────────────────────────────────────────

/// What happened to a folder's combined output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FolderOutput {
    Written { path: PathBuf },
    /// Every file failed (or the folder had none); nothing was written.
    NoSuccessfulDocuments,
    WriteFailed { message: String },
    /// An earlier export exists and skipping was requested.
    Skipped { existing: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderReport {
    pub name: String,
    pub kind: FolderKind,
    pub results: Vec<ConversionResult>,
    pub started: DateTime<Local>,
    pub ended: DateTime<Local>,
    pub output: FolderOutput,
}

impl FolderReport {
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn total_pages(&self) -> usize {
        self.results.iter().map(ConversionResult::pages).sum()
    }

    pub fn total_images(&self) -> usize {
        self.results.iter().map(ConversionResult::images).sum()
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.output {
            FolderOutput::Written { path } => Some(path),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self.kind {
            FolderKind::Root => "Root Directory",
            FolderKind::Subdirectory => &self.name,
        }
    }
}

// ── Run summary ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub folders: Vec<FolderReport>,
    pub started: DateTime<Local>,
    pub ended: DateTime<Local>,
    /// Path of the written `processing_summary_*.md`, once written.
    pub summary_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn folders_processed(&self) -> usize {
        self.folders.len()
    }

    pub fn output_files_written(&self) -> usize {
        self.folders
            .iter()
            .filter(|f| f.output_path().is_some())
            .count()
    }

    pub fn total_pages(&self) -> usize {
        self.folders.iter().map(FolderReport::total_pages).sum()
    }

    pub fn total_images(&self) -> usize {
        self.folders.iter().map(FolderReport::total_images).sum()
    }

    pub fn total_succeeded(&self) -> usize {
        self.folders.iter().map(FolderReport::succeeded).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.folders.iter().map(FolderReport::failed).sum()
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.ended - self.started)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// JSON view with the derived totals included.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "started": self.started.to_rfc3339(),
            "ended": self.ended.to_rfc3339(),
            "elapsed_secs": self.elapsed_secs(),
            "folders_processed": self.folders_processed(),
            "output_files_written": self.output_files_written(),
            "total_pages": self.total_pages(),
            "total_images": self.total_images(),
            "summary_path": self.summary_path,
            "folders": self.folders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn converted(name: &str, pages: usize, images: usize) -> ConversionResult {
        ConversionResult {
            source: PathBuf::from(name),
            outcome: FileOutcome::Converted {
                title: name.into(),
                pages,
                images,
                captioned: 0,
            },
        }
    }

    fn failed(name: &str) -> ConversionResult {
        ConversionResult {
            source: PathBuf::from(name),
            outcome: FileOutcome::Failed {
                error: "corrupt PDF: bad xref".into(),
            },
        }
    }

    fn report(name: &str, results: Vec<ConversionResult>, output: FolderOutput) -> FolderReport {
        let now = Local::now();
        FolderReport {
            name: name.into(),
            kind: FolderKind::Subdirectory,
            results,
            started: now,
            ended: now,
            output,
        }
    }

    #[test]
    fn folder_report_counts() {
        let r = report(
            "a",
            vec![converted("good.pdf", 2, 1), failed("bad.pdf")],
            FolderOutput::Written {
                path: PathBuf::from("exports/a.md"),
            },
        );
        assert_eq!(r.attempted(), 2);
        assert_eq!(r.succeeded(), 1);
        assert_eq!(r.failed(), 1);
        assert_eq!(r.total_pages(), 2);
        assert_eq!(r.total_images(), 1);
    }

    #[test]
    fn run_summary_totals() {
        let started = Local::now();
        let summary = RunSummary {
            folders: vec![
                report(
                    "folder1",
                    vec![converted("x.pdf", 3, 2)],
                    FolderOutput::Written {
                        path: PathBuf::from("exports/folder1.md"),
                    },
                ),
                report("folder2", vec![failed("y.pdf")], FolderOutput::NoSuccessfulDocuments),
            ],
            started,
            ended: started + Duration::milliseconds(1500),
            summary_path: None,
        };
        assert_eq!(summary.folders_processed(), 2);
        assert_eq!(summary.output_files_written(), 1);
        assert_eq!(summary.total_pages(), 3);
        assert_eq!(summary.total_failed(), 1);
        assert!((summary.elapsed_secs() - 1.5).abs() < 1e-6);

        let json = summary.to_json();
        assert_eq!(json["output_files_written"], 1);
        assert_eq!(json["folders"][1]["output"]["status"], "no_successful_documents");
    }

    #[test]
    fn blank_caption_is_no_caption() {
        let mut img = ExtractedImage::new(1, 0, vec![1, 2, 3], ImageFormat::Png);
        assert_eq!(img.caption_text(), None);
        img.caption = Some("   ".into());
        assert_eq!(img.caption_text(), None);
        img.caption = Some(" A chart ".into());
        assert_eq!(img.caption_text(), Some("A chart"));
    }

    #[test]
    fn root_folder_display_name() {
        let f = ImportFolder::root("imports", vec![]);
        assert_eq!(f.name, ROOT_FOLDER_NAME);
        assert_eq!(f.display_name(), "Root Directory");
        assert!(f.is_root());
    }
}
