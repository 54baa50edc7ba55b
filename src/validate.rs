//! Pre-flight checks (`--validate`) and the discovered-file listing (`--list-files`).
//!
//! Neither mode converts anything or writes to the export root.

use crate::config::{BatchConfig, ImageHandling};
use crate::output::{file_name_of, ImportFolder};
use crate::pipeline::discover::discover_folders;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Outcome of [`validate_configuration`], grouped by severity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub info: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_info(&mut self, msg: impl Into<String>) {
        self.info.push(msg.into());
    }

    pub fn push_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn push_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Plain-text rendering for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (title, items) in [
            ("Info", &self.info),
            ("Warnings", &self.warnings),
            ("Errors", &self.errors),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}:", title);
            for item in items {
                let _ = writeln!(out, "  - {}", item);
            }
        }
        let _ = writeln!(
            out,
            "Configuration is {}",
            if self.is_valid() { "valid" } else { "invalid" }
        );
        out
    }
}

/// Check paths and inputs without touching the PDF engine or the network.
///
/// The CLI adds its own checks for the pdfium library and the caption
/// provider on top of this report.
pub fn validate_configuration(config: &BatchConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    match discover_folders(&config.imports_dir) {
        Ok(folders) => {
            let files: usize = folders.iter().map(|f| f.files.len()).sum();
            report.push_info(format!("Import directory: {}", config.imports_dir.display()));
            report.push_info(format!("Folders found: {}", folders.len()));
            report.push_info(format!("PDF files found: {}", files));
            if files == 0 {
                report.push_warning(format!(
                    "No PDF files found in '{}'",
                    config.imports_dir.display()
                ));
            }
        }
        Err(e) => report.push_error(e.to_string()),
    }

    match check_export_root(&config.exports_dir) {
        Ok(msg) => report.push_info(msg),
        Err(msg) => report.push_error(msg),
    }

    report.push_info(format!(
        "Images: {}",
        match config.image_handling {
            ImageHandling::Describe => "embedded with AI captions",
            ImageHandling::EmbedOnly => "embedded without captions",
            ImageHandling::Omit => "omitted",
        }
    ));

    report
}

/// The export root must be an existing writable directory, or creatable
/// under its nearest existing ancestor.
fn check_export_root(path: &Path) -> Result<String, String> {
    if path.exists() {
        if !path.is_dir() {
            return Err(format!(
                "Export path exists but is not a directory: '{}'",
                path.display()
            ));
        }
        return if is_writable(path) {
            Ok(format!("Export directory: {} (writable)", path.display()))
        } else {
            Err(format!("Export directory is not writable: '{}'", path.display()))
        };
    }

    let ancestor = path
        .ancestors()
        .skip(1)
        .find(|a| a.as_os_str().is_empty() || a.exists());
    match ancestor {
        Some(a) if a.as_os_str().is_empty() || (a.is_dir() && is_writable(a)) => Ok(format!(
            "Export directory: {} (will be created)",
            path.display()
        )),
        _ => Err(format!(
            "Cannot create export directory '{}'",
            path.display()
        )),
    }
}

fn is_writable(dir: &Path) -> bool {
    std::fs::metadata(dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

/// Text listing of discovered folders: numbered files with sizes in MB.
pub fn file_listing(folders: &[ImportFolder]) -> String {
    let mut out = String::new();
    let mut total_files = 0;
    for folder in folders {
        let _ = writeln!(
            out,
            "{} ({} PDF file(s))",
            folder.display_name(),
            folder.files.len()
        );
        for (i, file) in folder.files.iter().enumerate() {
            let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
            let _ = writeln!(
                out,
                "  {:>3}. {} ({:.2} MB)",
                i + 1,
                file_name_of(file),
                size as f64 / (1024.0 * 1024.0)
            );
        }
        total_files += folder.files.len();
    }
    let _ = writeln!(
        out,
        "Total: {} folder(s), {} PDF file(s)",
        folders.len(),
        total_files
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(imports: &Path, exports: &Path) -> BatchConfig {
        BatchConfig::builder()
            .imports_dir(imports)
            .exports_dir(exports)
            .build()
            .unwrap()
    }

    #[test]
    fn missing_import_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_configuration(&config(&dir.path().join("nope"), dir.path()));
        assert!(!report.is_valid());
        assert!(report.errors[0].contains("Import directory not found"));
    }

    #[test]
    fn empty_import_root_warns() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_configuration(&config(dir.path(), &dir.path().join("out")));
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.info.iter().any(|i| i.contains("will be created")));
    }

    #[test]
    fn export_path_that_is_a_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("exports");
        fs::write(&file, "x").unwrap();
        let report = validate_configuration(&config(dir.path(), &file));
        assert!(report.errors.iter().any(|e| e.contains("not a directory")));
    }

    #[test]
    fn render_reports_validity() {
        let mut r = ValidationReport::default();
        r.push_info("Folders found: 1");
        assert!(r.render().ends_with("Configuration is valid\n"));
        r.push_error("boom");
        let text = r.render();
        assert!(text.contains("Errors:\n  - boom\n"));
        assert!(text.ends_with("Configuration is invalid\n"));
    }

    #[test]
    fn listing_numbers_files_with_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        fs::write(&pdf, vec![0u8; 1024 * 1024]).unwrap();
        let folders = vec![ImportFolder::subdirectory("docs", dir.path(), vec![pdf])];
        let text = file_listing(&folders);
        assert!(text.contains("docs (1 PDF file(s))"));
        assert!(text.contains("    1. a.pdf (1.00 MB)"));
        assert!(text.contains("Total: 1 folder(s), 1 PDF file(s)"));
    }
}
