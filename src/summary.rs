//! Run summary: the `processing_summary_{unix}.md` report written after every run.

use crate::output::{file_name_of, FolderOutput, FolderReport, RunSummary};
use chrono::{DateTime, Local};
use std::fmt::Write as _;

/// Timestamp format used in the report body.
pub const SUMMARY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filename for a summary started at `started`.
pub fn summary_file_name(started: DateTime<Local>) -> String {
    format!("processing_summary_{}.md", started.timestamp())
}

/// Render the report for a finished run.
pub fn build(summary: &RunSummary) -> String {
    build_report(&summary.folders, summary.started, summary.ended)
}

pub fn build_report(folders: &[FolderReport], started: DateTime<Local>, ended: DateTime<Local>) -> String {
    let elapsed = (ended - started)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let written = folders.iter().filter(|f| f.output_path().is_some()).count();
    let pages: usize = folders.iter().map(FolderReport::total_pages).sum();
    let images: usize = folders.iter().map(FolderReport::total_images).sum();

    let mut md = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(md, "# Processing Summary\n");
    let _ = writeln!(md, "- **Started:** {}", started.format(SUMMARY_TIME_FORMAT));
    let _ = writeln!(md, "- **Elapsed:** {:.2} seconds", elapsed);
    let _ = writeln!(md, "- **Folders processed:** {}", folders.len());
    let _ = writeln!(md, "- **Output files generated:** {}", written);
    let _ = writeln!(md, "- **Total pages:** {}", pages);
    let _ = writeln!(md, "- **Total images:** {}", images);

    if folders.is_empty() {
        let _ = writeln!(md, "\nNo folders with PDF files were found.");
        return md;
    }

    for folder in folders {
        let _ = writeln!(md, "\n## {}\n", folder.display_name());
        let _ = writeln!(md, "*Output: {}*  ", output_status(&folder.output));
        let _ = writeln!(
            md,
            "*Files: {} attempted, {} succeeded, {} failed*\n",
            folder.attempted(),
            folder.succeeded(),
            folder.failed()
        );
        for result in &folder.results {
            match result.error() {
                None => {
                    let _ = writeln!(md, "- `{}`: success", result.file_name());
                }
                Some(err) => {
                    let _ = writeln!(md, "- `{}`: failed — {}", result.file_name(), flatten(err));
                }
            }
        }
    }

    md
}

fn output_status(output: &FolderOutput) -> String {
    match output {
        FolderOutput::Written { path } => file_name_of(path),
        FolderOutput::NoSuccessfulDocuments => "none (no document converted)".to_string(),
        FolderOutput::WriteFailed { message } => format!("write failed: {}", flatten(message)),
        FolderOutput::Skipped { existing } => {
            format!("skipped, already converted as {}", file_name_of(existing))
        }
    }
}

fn flatten(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ConversionResult, FileOutcome, FolderKind};
    use chrono::{Duration, TimeZone};
    use std::path::PathBuf;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn folder(name: &str, results: Vec<ConversionResult>, output: FolderOutput) -> FolderReport {
        FolderReport {
            name: name.into(),
            kind: FolderKind::Subdirectory,
            results,
            started: t0(),
            ended: t0(),
            output,
        }
    }

    #[test]
    fn empty_run_reports_zero_folders() {
        let md = build_report(&[], t0(), t0() + Duration::seconds(2));
        assert!(md.contains("**Folders processed:** 0"));
        assert!(md.contains("**Output files generated:** 0"));
        assert!(md.contains("**Elapsed:** 2.00 seconds"));
        assert!(md.contains("**Started:** 2024-03-01 09:30:00"));
    }

    #[test]
    fn lists_successes_and_failures() {
        let results = vec![
            ConversionResult {
                source: PathBuf::from("imports/a/good.pdf"),
                outcome: FileOutcome::Converted {
                    title: "Good".into(),
                    pages: 2,
                    images: 1,
                    captioned: 1,
                },
            },
            ConversionResult {
                source: PathBuf::from("imports/a/bad.pdf"),
                outcome: FileOutcome::Failed {
                    error: "not a valid PDF\n(first bytes)".into(),
                },
            },
        ];
        let md = build_report(
            &[folder(
                "a",
                results,
                FolderOutput::Written {
                    path: PathBuf::from("exports/a_2024-03-01_09-30-00.md"),
                },
            )],
            t0(),
            t0(),
        );
        assert!(md.contains("## a"));
        assert!(md.contains("*Output: a_2024-03-01_09-30-00.md*"));
        assert!(md.contains("- `good.pdf`: success"));
        assert!(md.contains("- `bad.pdf`: failed — not a valid PDF (first bytes)"));
        assert!(md.contains("**Total pages:** 2"));
        assert!(md.contains("**Total images:** 1"));
    }

    #[test]
    fn failed_folder_counts_as_processed_not_written() {
        let md = build_report(
            &[
                folder("folder1", vec![], FolderOutput::Written { path: PathBuf::from("f1.md") }),
                folder("folder2", vec![], FolderOutput::NoSuccessfulDocuments),
            ],
            t0(),
            t0(),
        );
        assert!(md.contains("**Folders processed:** 2"));
        assert!(md.contains("**Output files generated:** 1"));
        assert!(md.contains("none (no document converted)"));
    }

    #[test]
    fn summary_file_name_uses_unix_time() {
        assert_eq!(
            summary_file_name(t0()),
            format!("processing_summary_{}.md", t0().timestamp())
        );
    }
}
