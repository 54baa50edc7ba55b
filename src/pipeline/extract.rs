//! PDF extraction: ordered pages with text and embedded images, via pdfium.
//!
//! Extraction is synchronous. pdfium is a C++ library with thread-local state
//! and the batch processes one file at a time, so there is nothing to gain
//! from `spawn_blocking` here.
//!
//! The [`Extractor`] trait is the seam the orchestrator depends on; tests
//! substitute a fake that returns canned documents without a pdfium library.

use crate::error::{BatchError, ExtractionError};
use crate::output::{DocumentInfo, ExtractedDocument, ExtractedImage, ImageFormat, Page};
use crate::pipeline::encode::encode_png;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Env var pointing at a pdfium shared library or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Turns a PDF file into an [`ExtractedDocument`].
pub trait Extractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError>;
}

/// Verify that `path` is readable and starts with the `%PDF` magic bytes.
///
/// Runs before pdfium sees the file so that a renamed `.txt` gets a clear
/// "not a valid PDF" rather than a generic parser failure.
pub fn check_pdf_header(path: &Path) -> Result<(), ExtractionError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ExtractionError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractionError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mut magic = Vec::with_capacity(4);
    file.by_ref()
        .take(4)
        .read_to_end(&mut magic)
        .map_err(|e| ExtractionError::Corrupt {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    if magic != b"%PDF" {
        return Err(ExtractionError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Bind to a pdfium library.
///
/// Search order:
/// 1. `PDFIUM_LIB_PATH` (a library file, or a directory containing one)
/// 2. the current directory
/// 3. system library paths
pub fn bind_pdfium() -> Result<Pdfium, BatchError> {
    let from_env = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let bindings = match from_env {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&p))
        }
        Some(p) => Pdfium::bind_to_library(&p),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    }
    .or_else(|_| Pdfium::bind_to_system_library())
    .map_err(|e| BatchError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// [`Extractor`] backed by pdfium.
pub struct PdfiumExtractor {
    pdfium: Pdfium,
}

impl PdfiumExtractor {
    /// Bind to the pdfium library and create an extractor.
    pub fn new() -> Result<Self, BatchError> {
        let pdfium = bind_pdfium()?;
        info!("pdfium library bound");
        Ok(Self { pdfium })
    }
}

impl Extractor for PdfiumExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        check_pdf_header(path)?;

        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| classify_load_error(path, e))?;

        let info = read_info(&document);
        let page_count = document.pages().len() as usize;
        debug!("{}: {} pages", path.display(), page_count);

        let mut pages = Vec::with_capacity(page_count);
        for (idx, page) in document.pages().iter().enumerate() {
            let number = idx + 1;
            let text = page
                .text()
                .map_err(|e| ExtractionError::PageFailed {
                    path: path.to_path_buf(),
                    page: number,
                    detail: format!("{:?}", e),
                })?
                .all();

            let images = extract_page_images(&page, number, path);
            debug!(
                "Page {}: {} chars, {} images",
                number,
                text.len(),
                images.len()
            );
            pages.push(Page {
                number,
                text,
                images,
            });
        }

        Ok(ExtractedDocument {
            source: path.to_path_buf(),
            info,
            page_count,
            pages,
        })
    }
}

fn classify_load_error(path: &Path, e: PdfiumError) -> ExtractionError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        ExtractionError::PasswordRequired {
            path: path.to_path_buf(),
        }
    } else {
        ExtractionError::Corrupt {
            path: path.to_path_buf(),
            detail,
        }
    }
}

fn read_info(document: &PdfDocument) -> DocumentInfo {
    let metadata = document.metadata();
    let get = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentInfo {
        title: get(PdfDocumentMetadataTagType::Title),
        author: get(PdfDocumentMetadataTagType::Author),
        subject: get(PdfDocumentMetadataTagType::Subject),
        creator: get(PdfDocumentMetadataTagType::Creator),
        producer: get(PdfDocumentMetadataTagType::Producer),
    }
}

/// Pull every image object on a page, re-encoded as PNG.
///
/// An image pdfium cannot decode is skipped with a warning; it does not fail
/// the page.
fn extract_page_images(page: &PdfPage, number: usize, path: &Path) -> Vec<ExtractedImage> {
    let encoded = page.objects().iter().filter_map(|object| {
        object.as_image_object().map(|image_object| {
            image_object
                .get_raw_image()
                .map_err(|e| format!("could not be decoded: {:?}", e))
                .and_then(|decoded| {
                    encode_png(&decoded).map_err(|e| format!("could not be encoded: {}", e))
                })
        })
    });

    keep_encoded(encoded, |index, reason| {
        warn!(
            "{}: page {} image {} {}",
            path.display(),
            number,
            index,
            reason
        )
    })
    .into_iter()
    .map(|(index, bytes)| ExtractedImage::new(number, index, bytes, ImageFormat::Png))
    .collect()
}

/// Pair each successfully encoded image with its position among all image
/// objects on the page; failures keep their slot so later indices stay put.
fn keep_encoded<T>(
    images: impl Iterator<Item = Result<T, String>>,
    mut on_skip: impl FnMut(usize, &str),
) -> Vec<(usize, T)> {
    images
        .enumerate()
        .filter_map(|(index, result)| match result {
            Ok(bytes) => Some((index, bytes)),
            Err(reason) => {
                on_skip(index, &reason);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn header_check_accepts_pdf_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n...").unwrap();
        assert!(check_pdf_header(f.path()).is_ok());
    }

    #[test]
    fn header_check_rejects_other_bytes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        let err = check_pdf_header(f.path()).unwrap_err();
        match err {
            ExtractionError::NotAPdf { magic, .. } => assert_eq!(magic, b"hell"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn header_check_rejects_short_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(matches!(
            check_pdf_header(f.path()),
            Err(ExtractionError::NotAPdf { .. })
        ));
    }

    #[test]
    fn header_check_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            check_pdf_header(&dir.path().join("nope.pdf")),
            Err(ExtractionError::FileNotFound { .. })
        ));
    }

    #[test]
    fn skipped_images_keep_their_page_position() {
        let results = vec![
            Ok("first"),
            Err("could not be decoded: bad stream".to_string()),
            Ok("third"),
        ];
        let mut skipped = Vec::new();
        let kept = keep_encoded(results.into_iter(), |index, reason| {
            skipped.push((index, reason.to_string()))
        });
        assert_eq!(kept, vec![(0, "first"), (2, "third")]);
        assert_eq!(
            skipped,
            vec![(1, "could not be decoded: bad stream".to_string())]
        );
    }
}
