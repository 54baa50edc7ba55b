//! Folder batch orchestration: discover → process each folder → write → summary.
//!
//! ## Failure isolation
//!
//! Errors are contained at the smallest level that can absorb them:
//!
//! | Failure | Absorbed by | Effect |
//! |---------|-------------|--------|
//! | caption call | the image | image rendered without caption text |
//! | extraction | the file | `FileOutcome::Failed`, folder carries on |
//! | output write | the folder | `FolderOutput::WriteFailed`, run carries on |
//! | import/export root, summary write | the run | `Err(BatchError)` |
//!
//! ## Memory
//!
//! Files are processed one at a time. An [`ExtractedDocument`] is dropped as
//! soon as it has been rendered, so at most one document's images are held
//! in decoded form; the folder keeps only the rendered Markdown sections.

use crate::config::BatchConfig;
use crate::error::{BatchError, WriteError};
use crate::output::{
    file_name_of, ConversionResult, ExtractedDocument, FileOutcome, FolderOutput, FolderReport,
    ImportFolder, RunSummary,
};
use crate::pipeline::caption::Captioner;
use crate::pipeline::discover::discover_folders;
use crate::pipeline::extract::Extractor;
use crate::pipeline::postprocess::{escape_alt_text, sanitize_filename, AnchorSet};
use crate::pipeline::render::{DocumentRenderer, MarkdownSection, PROCESSED_AT_FORMAT};
use crate::summary;
use chrono::{DateTime, Local};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Timestamp format embedded in named-folder output filenames.
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// The result of processing one folder, before its output is written.
#[derive(Debug, Clone)]
pub struct ProcessedFolder {
    pub report: FolderReport,
    /// One section per successfully converted file, in processing order.
    pub sections: Vec<MarkdownSection>,
}

/// Drives a batch run over an import root.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfbatch::{BatchConfig, Orchestrator, PdfiumExtractor, VlmCaptioner};
///
/// let config = BatchConfig::builder().imports_dir("imports").build()?;
/// let captioner = VlmCaptioner::from_config(&config)?;
/// let orchestrator = Orchestrator::new(config, Box::new(PdfiumExtractor::new()?))
///     .with_captioner(Box::new(captioner));
/// let summary = orchestrator.run()?;
/// println!("{} file(s) written", summary.output_files_written());
/// # Ok::<(), edgequake_pdfbatch::BatchError>(())
/// ```
pub struct Orchestrator {
    config: BatchConfig,
    extractor: Box<dyn Extractor>,
    captioner: Option<Box<dyn Captioner>>,
    renderer: DocumentRenderer,
}

impl Orchestrator {
    pub fn new(config: BatchConfig, extractor: Box<dyn Extractor>) -> Self {
        let renderer = DocumentRenderer::from_config(&config);
        Self {
            config,
            extractor,
            captioner: None,
            renderer,
        }
    }

    /// Attach an image captioner. It is only called when the configuration
    /// asks for [`crate::ImageHandling::Describe`].
    pub fn with_captioner(mut self, captioner: Box<dyn Captioner>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// List document folders under `import_root`. See [`discover_folders`].
    pub fn discover(&self, import_root: &Path) -> Result<Vec<ImportFolder>, BatchError> {
        discover_folders(import_root)
    }

    /// Run the whole batch and write the run summary.
    pub fn run(&self) -> Result<RunSummary, BatchError> {
        let started = Local::now();
        let folders = self.discover(&self.config.imports_dir)?;

        let exports = &self.config.exports_dir;
        fs::create_dir_all(exports).map_err(|source| BatchError::ExportRootUnavailable {
            path: exports.clone(),
            source,
        })?;

        let total_files: usize = folders.iter().map(|f| f.files.len()).sum();
        info!(
            "Found {} folder(s) with {} PDF file(s) in '{}'",
            folders.len(),
            total_files,
            self.config.imports_dir.display()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(folders.len(), total_files);
        }

        let mut reports = Vec::with_capacity(folders.len());
        for folder in &folders {
            let report = match self.already_converted(folder) {
                Some(existing) => {
                    info!(
                        "Skipping folder '{}': already converted as '{}'",
                        folder.name,
                        existing.display()
                    );
                    let now = Local::now();
                    FolderReport {
                        name: folder.name.clone(),
                        kind: folder.kind,
                        results: Vec::new(),
                        started: now,
                        ended: now,
                        output: FolderOutput::Skipped { existing },
                    }
                }
                None => {
                    let ProcessedFolder {
                        mut report,
                        sections,
                    } = self.process_folder(folder);
                    report.output = match self.write_folder_output(folder, &report, &sections) {
                        Ok(Some(path)) => FolderOutput::Written { path },
                        Ok(None) => FolderOutput::NoSuccessfulDocuments,
                        Err(e) => {
                            warn!("{}", e);
                            FolderOutput::WriteFailed {
                                message: e.to_string(),
                            }
                        }
                    };
                    report
                }
            };
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_folder_complete(&report);
            }
            reports.push(report);
        }

        let mut run = RunSummary {
            folders: reports,
            started,
            ended: Local::now(),
            summary_path: None,
        };

        let summary_path = exports.join(summary::summary_file_name(started));
        fs::write(&summary_path, summary::build(&run)).map_err(|source| {
            BatchError::SummaryWriteFailed {
                path: summary_path.clone(),
                source,
            }
        })?;
        info!("Summary written to '{}'", summary_path.display());
        run.summary_path = Some(summary_path);

        Ok(run)
    }

    /// Extract, caption and render every PDF in `folder`.
    ///
    /// Never fails: a file that cannot be converted is recorded as a failed
    /// [`ConversionResult`] and the next file is tried.
    pub fn process_folder(&self, folder: &ImportFolder) -> ProcessedFolder {
        info!(
            "Processing folder '{}' ({} PDF file(s))",
            folder.display_name(),
            folder.files.len()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_folder_start(folder.display_name(), folder.files.len());
        }

        let started = Local::now();
        let mut results = Vec::with_capacity(folder.files.len());
        let mut sections = Vec::new();

        for path in &folder.files {
            let name = file_name_of(path);
            match self.extractor.extract(path) {
                Ok(mut doc) => {
                    let captioned = self.caption_images(&mut doc);
                    let section = self.renderer.render(&doc, Local::now());
                    let (pages, images) = (doc.page_count, doc.image_count());
                    drop(doc);

                    info!("Converted '{}': {} page(s), {} image(s)", name, pages, images);
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_file_complete(&name, pages, images);
                    }
                    results.push(ConversionResult {
                        source: path.clone(),
                        outcome: FileOutcome::Converted {
                            title: section.title.clone(),
                            pages,
                            images,
                            captioned,
                        },
                    });
                    sections.push(section);
                }
                Err(e) => {
                    warn!("Failed to convert '{}': {}", path.display(), e);
                    let error = e.to_string();
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_file_error(&name, &error);
                    }
                    results.push(ConversionResult {
                        source: path.clone(),
                        outcome: FileOutcome::Failed { error },
                    });
                }
            }
        }

        let report = FolderReport {
            name: folder.name.clone(),
            kind: folder.kind,
            results,
            started,
            ended: Local::now(),
            output: FolderOutput::NoSuccessfulDocuments,
        };
        ProcessedFolder { report, sections }
    }

    /// Caption every image in `doc`, returning how many got a caption.
    fn caption_images(&self, doc: &mut ExtractedDocument) -> usize {
        let captioner = match self.captioner.as_deref() {
            Some(c) if self.config.describes_images() => c,
            _ => return 0,
        };

        let name = file_name_of(&doc.source);
        let mut captioned = 0;
        for image in doc.images_mut() {
            match captioner.caption(image) {
                Ok(caption) => {
                    if !caption.trim().is_empty() {
                        captioned += 1;
                    }
                    image.caption = Some(caption);
                }
                Err(e) => {
                    debug!("{}: caption unavailable: {}", name, e);
                    image.caption = Some(String::new());
                }
            }
        }
        captioned
    }

    /// Write the combined Markdown file for a processed folder.
    ///
    /// Returns `Ok(None)` without touching the disk when no file in the
    /// folder converted.
    pub fn write_folder_output(
        &self,
        folder: &ImportFolder,
        report: &FolderReport,
        sections: &[MarkdownSection],
    ) -> Result<Option<PathBuf>, WriteError> {
        if report.succeeded() == 0 || sections.is_empty() {
            warn!(
                "No document in '{}' converted; no output written",
                folder.display_name()
            );
            return Ok(None);
        }

        let path = self.output_path(folder, Local::now());
        let content = self.assemble(folder, sections, report.ended);
        fs::write(&path, content).map_err(|source| WriteError {
            path: path.clone(),
            source,
        })?;
        info!(
            "Wrote '{}' ({} document(s))",
            path.display(),
            sections.len()
        );
        Ok(Some(path))
    }

    /// Header, table of contents, then every section separated by the
    /// section separator.
    fn assemble(&self, folder: &ImportFolder, sections: &[MarkdownSection], at: DateTime<Local>) -> String {
        let heading = format!("Combined Documents: {}", folder.display_name());
        let mut anchors = AnchorSet::new();
        anchors.unique(&heading);
        anchors.unique("Table of Contents");

        let mut md = format!("# {}\n\n", heading);
        md.push_str(&format!(
            "*Generated from {} document(s) on {}*\n\n",
            sections.len(),
            at.format(PROCESSED_AT_FORMAT)
        ));
        md.push_str("## Table of Contents\n\n");

        let sections: Vec<MarkdownSection> = sections
            .iter()
            .map(|s| MarkdownSection {
                anchor: anchors.unique(&s.title),
                ..s.clone()
            })
            .collect();

        for (i, s) in sections.iter().enumerate() {
            md.push_str(&format!(
                "{}. [{}](#{})\n",
                i + 1,
                escape_alt_text(&s.title),
                s.anchor
            ));
        }

        for s in &sections {
            md.push_str(&format!("\n{}\n\n", self.config.section_separator));
            md.push_str(&s.markdown);
        }
        md
    }

    /// Output path for a folder. Named folders get a timestamped name with a
    /// numeric suffix if that name is already taken; the root group uses the
    /// configured name as-is.
    pub fn output_path(&self, folder: &ImportFolder, at: DateTime<Local>) -> PathBuf {
        let exports = &self.config.exports_dir;
        if folder.is_root() {
            return exports.join(&self.config.root_output_name);
        }

        let stem = format!(
            "{}_{}",
            sanitize_filename(&folder.name),
            at.format(OUTPUT_TIMESTAMP_FORMAT)
        );
        let mut candidate = exports.join(format!("{}.md", stem));
        let mut n = 2;
        while candidate.exists() {
            candidate = exports.join(format!("{}_{}.md", stem, n));
            n += 1;
        }
        candidate
    }

    /// Newest earlier export for `folder`, when skipping converted folders.
    fn already_converted(&self, folder: &ImportFolder) -> Option<PathBuf> {
        if !self.config.skip_already_converted || folder.is_root() {
            return None;
        }
        find_existing_output(&self.config.exports_dir, &sanitize_filename(&folder.name))
    }
}

/// Find the newest `{stem}_{timestamp}[_n].md` in `exports`.
///
/// Timestamps sort lexically, so the greatest filename is the newest.
pub fn find_existing_output(exports: &Path, stem: &str) -> Option<PathBuf> {
    let pattern = format!(
        r"^{}_\d{{4}}-\d{{2}}-\d{{2}}_\d{{2}}-\d{{2}}-\d{{2}}(?:_\d+)?\.md$",
        regex::escape(stem)
    );
    let re = Regex::new(&pattern).ok()?;
    fs::read_dir(exports)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| re.is_match(n))
                .unwrap_or(false)
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CaptionError, ExtractionError};
    use crate::output::{DocumentInfo, ExtractedImage, ImageFormat, Page};
    use chrono::TimeZone;
    use std::cell::Cell;

    struct OnePageExtractor;

    impl Extractor for OnePageExtractor {
        fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
            if path.ends_with("bad.pdf") {
                return Err(ExtractionError::Corrupt {
                    path: path.to_path_buf(),
                    detail: "xref missing".into(),
                });
            }
            Ok(ExtractedDocument {
                source: path.to_path_buf(),
                info: DocumentInfo::default(),
                page_count: 1,
                pages: vec![Page {
                    number: 1,
                    text: "text".into(),
                    images: vec![ExtractedImage::new(1, 0, vec![1], ImageFormat::Png)],
                }],
            })
        }
    }

    struct FailingCaptioner {
        calls: Cell<usize>,
    }

    impl Captioner for FailingCaptioner {
        fn caption(&self, image: &ExtractedImage) -> Result<String, CaptionError> {
            self.calls.set(self.calls.get() + 1);
            Err(CaptionError::EmptyResponse {
                page: image.page,
                index: image.index,
            })
        }
    }

    fn folder(files: &[&str]) -> ImportFolder {
        ImportFolder::subdirectory(
            "a",
            "imports/a",
            files.iter().map(|f| PathBuf::from("imports/a").join(f)).collect(),
        )
    }

    fn orchestrator(exports: &Path) -> Orchestrator {
        let config = BatchConfig::builder().exports_dir(exports).build().unwrap();
        Orchestrator::new(config, Box::new(OnePageExtractor))
    }

    #[test]
    fn bad_file_does_not_abort_folder() {
        let dir = tempfile::tempdir().unwrap();
        let processed = orchestrator(dir.path()).process_folder(&folder(&["bad.pdf", "good.pdf"]));
        assert_eq!(processed.report.attempted(), 2);
        assert_eq!(processed.report.succeeded(), 1);
        assert_eq!(processed.sections.len(), 1);
        assert_eq!(
            processed.report.results[0].error(),
            Some("corrupt PDF: xref missing")
        );
    }

    #[test]
    fn caption_failure_degrades_to_empty_caption() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).with_captioner(Box::new(FailingCaptioner {
            calls: Cell::new(0),
        }));
        let processed = orch.process_folder(&folder(&["good.pdf"]));
        assert!(processed.report.results[0].success());
        assert!(processed.sections[0]
            .markdown
            .contains("![Image 1 (Page 1)](data:image/png;base64,AQ==)"));
        match &processed.report.results[0].outcome {
            FileOutcome::Converted { captioned, .. } => assert_eq!(*captioned, 0),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn no_output_when_nothing_succeeded() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let f = folder(&["bad.pdf"]);
        let processed = orch.process_folder(&f);
        let written = orch
            .write_folder_output(&f, &processed.report, &processed.sections)
            .unwrap();
        assert!(written.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn toc_anchors_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let f = ImportFolder::subdirectory(
            "a",
            "imports/a",
            vec![
                PathBuf::from("imports/a/intro.pdf"),
                PathBuf::from("imports/a/x/intro.pdf"),
            ],
        );
        let processed = orch.process_folder(&f);
        let path = orch
            .write_folder_output(&f, &processed.report, &processed.sections)
            .unwrap()
            .unwrap();
        let md = fs::read_to_string(path).unwrap();
        assert!(md.contains("1. [Intro](#intro)\n2. [Intro](#intro-1)\n"), "got: {md}");
        assert_eq!(md.matches("\n___\n\n").count(), 2);
    }

    #[test]
    fn output_path_adds_suffix_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let f = ImportFolder::subdirectory("Q1 Reports", "imports/Q1 Reports", vec![]);

        let first = orch.output_path(&f, at);
        assert_eq!(
            first.file_name().unwrap(),
            "Q1_Reports_2024-03-01_09-30-00.md"
        );
        fs::write(&first, "x").unwrap();
        let second = orch.output_path(&f, at);
        assert_eq!(
            second.file_name().unwrap(),
            "Q1_Reports_2024-03-01_09-30-00_2.md"
        );
    }

    #[test]
    fn root_output_uses_configured_name() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let root = ImportFolder::root("imports", vec![]);
        assert_eq!(
            orch.output_path(&root, Local::now()),
            dir.path().join("combined_documents.md")
        );
    }

    #[test]
    fn find_existing_output_picks_newest() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "a_2024-01-01_00-00-00.md",
            "a_2024-02-01_00-00-00.md",
            "a_b_2025-01-01_00-00-00.md",
            "a_notes.md",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let found = find_existing_output(dir.path(), "a").unwrap();
        assert_eq!(found.file_name().unwrap(), "a_2024-02-01_00-00-00.md");
        assert!(find_existing_output(dir.path(), "zzz").is_none());
    }
}
