//! Folder discovery: import root → ordered list of [`ImportFolder`]s.
//!
//! Only one level is scanned. Each visible subdirectory holding at least one
//! `.pdf` becomes a named folder; loose PDFs directly under the root form the
//! root group, which always comes first. Everything is sorted so that a run
//! over the same tree is reproducible.

use crate::error::BatchError;
use crate::output::ImportFolder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Case-insensitive `.pdf` extension check.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Verify the import root exists and is a directory.
pub fn check_import_root(root: &Path) -> Result<(), BatchError> {
    if !root.exists() {
        return Err(BatchError::ImportRootMissing {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(BatchError::ImportRootNotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

/// Enumerate document folders under `root`.
pub fn discover_folders(root: &Path) -> Result<Vec<ImportFolder>, BatchError> {
    check_import_root(root)?;

    let unreadable = |source| BatchError::ImportRootUnreadable {
        path: root.to_path_buf(),
        source,
    };

    let mut subdirs = Vec::new();
    let mut loose = Vec::new();
    for entry in std::fs::read_dir(root).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            subdirs.push(path);
        } else if path.is_file() && is_pdf(&path) {
            loose.push(path);
        }
    }
    subdirs.sort();
    loose.sort();

    let mut folders = Vec::with_capacity(subdirs.len() + 1);
    if !loose.is_empty() {
        debug!("Root group: {} PDF(s)", loose.len());
        folders.push(ImportFolder::root(root, loose));
    }

    for dir in subdirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let files = match list_pdfs(&dir) {
            Ok(files) => files,
            Err(e) => {
                info!("Skipping folder '{}': cannot be read ({})", name, e);
                continue;
            }
        };
        if files.is_empty() {
            info!("Skipping folder '{}': no PDF files", name);
            continue;
        }
        debug!("Folder '{}': {} PDF(s)", name, files.len());
        folders.push(ImportFolder::subdirectory(name, dir, files));
    }

    Ok(folders)
}

/// PDF files directly inside `dir`, sorted by filename.
pub fn list_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{FolderKind, ROOT_FOLDER_NAME};
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"%PDF-1.4").unwrap();
    }

    #[test]
    fn pdf_extension_case_insensitive() {
        assert!(is_pdf(Path::new("a.PDF")));
        assert!(is_pdf(Path::new("a.pdf")));
        assert!(!is_pdf(Path::new("a.pdf.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_folders(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, BatchError::ImportRootMissing { .. }));
    }

    #[test]
    fn file_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.pdf");
        touch(&file);
        let err = discover_folders(&file).unwrap_err();
        assert!(matches!(err, BatchError::ImportRootNotADirectory { .. }));
    }

    #[test]
    fn empty_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_folders(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn ordering_root_first_then_lexical() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("zeta/b.pdf"));
        touch(&root.join("zeta/a.PDF"));
        touch(&root.join("alpha/x.pdf"));
        touch(&root.join("loose.pdf"));
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::write(root.join("notes/readme.txt"), b"x").unwrap();
        touch(&root.join(".hidden/secret.pdf"));

        let folders = discover_folders(root).unwrap();
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![ROOT_FOLDER_NAME, "alpha", "zeta"]);
        assert_eq!(folders[0].kind, FolderKind::Root);

        let zeta: Vec<_> = folders[2]
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(zeta, vec!["a.PDF", "b.pdf"]);
    }
}
