//! Upload staging: turn an uploaded file into a local path the extractors
//! can open.
//!
//! The tesseract CLI and lopdf both want a file-system path, so the upload is
//! written into the configured upload directory under a sanitised, uniquely
//! suffixed name. [`StagedUpload`] owns that file: dropping it deletes it, so
//! the file is gone after extraction on every exit path, error or not.

use crate::error::SolverError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

/// Which extractor handles an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.png`, `.jpg`, `.jpeg`: OCR path.
    Image,
    /// `.pdf`: text-layer path.
    Pdf,
}

impl FileKind {
    /// Classify a filename by its (case-insensitive) extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        if [".png", ".jpg", ".jpeg"].iter().any(|ext| lower.ends_with(ext)) {
            Some(FileKind::Image)
        } else if lower.ends_with(".pdf") {
            Some(FileKind::Pdf)
        } else {
            None
        }
    }
}

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Reduce a client-supplied filename to a safe ASCII name.
///
/// Folds Unicode to ASCII (NFKD, non-ASCII dropped), turns path separators
/// into spaces, joins whitespace-separated words with `_`, drops everything
/// outside `[A-Za-z0-9_.-]` and strips leading/trailing `.` and `_`.
/// The result never contains a path component; it may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(|c| c.is_ascii()).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped = RE_UNSAFE_CHARS.replace_all(&joined, "");
    stripped.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// An upload written to the upload directory. Deleted on drop.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    filename: String,
    kind: FileKind,
}

impl StagedUpload {
    /// Path of the staged copy.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Sanitised client filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        debug!("Removing staged upload: {}", self.file.path().display());
    }
}

/// Create the upload directory if it does not exist yet.
pub async fn ensure_upload_dir(dir: &Path) -> Result<(), SolverError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SolverError::UploadWriteFailed {
            dir: dir.to_path_buf(),
            source: e,
        })
}

/// Write an upload into `upload_dir` and classify it.
///
/// An empty or fully unsafe filename is treated as no file at all. Files
/// with an unsupported extension are still written (and re-opened) first,
/// then removed before [`SolverError::UnsupportedFileType`] is returned.
pub async fn stage_upload<B>(
    upload_dir: &Path,
    raw_filename: &str,
    bytes: B,
) -> Result<StagedUpload, SolverError>
where
    B: AsRef<[u8]> + Send + 'static,
{
    let filename = sanitize_filename(raw_filename);
    if filename.is_empty() {
        return Err(SolverError::NoFileUploaded);
    }

    let dir = upload_dir.to_path_buf();
    let name = filename.clone();
    let file = tokio::task::spawn_blocking(move || write_staged(&dir, &name, bytes.as_ref()))
        .await
        .map_err(|e| SolverError::Internal(format!("Staging task panicked: {e}")))??;

    info!("File uploaded: {}", file.path().display());

    let Some(kind) = FileKind::from_filename(&filename) else {
        warn!("Unsupported file type: {}", filename);
        drop(file);
        return Err(SolverError::UnsupportedFileType { filename });
    };

    Ok(StagedUpload {
        file,
        filename,
        kind,
    })
}

/// Blocking half of [`stage_upload`]: write, flush, re-open.
fn write_staged(dir: &Path, filename: &str, bytes: &[u8]) -> Result<NamedTempFile, SolverError> {
    let write_err = |source: std::io::Error| SolverError::UploadWriteFailed {
        dir: dir.to_path_buf(),
        source,
    };

    let (stem, ext) = split_extension(filename);
    let prefix = format!("{stem}-");
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&ext)
        .tempfile_in(dir)
        .map_err(write_err)?;
    file.write_all(bytes).map_err(write_err)?;
    file.flush().map_err(write_err)?;

    // Confirm the staged copy is readable before handing it to an extractor.
    File::open(file.path()).map_err(write_err)?;
    debug!("Reopened file for reading: {}", file.path().display());

    Ok(file)
}

/// Split `name.ext` into (`name`, `.ext`). Names without a dot get no suffix.
fn split_extension(filename: &str) -> (String, String) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
        _ => (filename.to_string(), String::new()),
    }
}

/// List the files currently in `dir` (used to verify cleanup).
pub fn staged_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::from_filename("scan.png"), Some(FileKind::Image));
        assert_eq!(FileKind::from_filename("scan.JPG"), Some(FileKind::Image));
        assert_eq!(FileKind::from_filename("scan.jpeg"), Some(FileKind::Image));
        assert_eq!(FileKind::from_filename("sheet.Pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_filename("notes.txt"), None);
        assert_eq!(FileKind::from_filename("png"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(sanitize_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_umlauts.txt");
        assert_eq!(sanitize_filename("C:\\Users\\hw 1.PNG"), "C_Users_hw_1.PNG");
        assert_eq!(sanitize_filename("..."), "");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("hw.pdf"), ("hw".into(), ".pdf".into()));
        assert_eq!(split_extension("a.b.png"), ("a.b".into(), ".png".into()));
        assert_eq!(split_extension("README"), ("README".into(), String::new()));
    }

    #[tokio::test]
    async fn staged_upload_is_removed_on_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let staged = stage_upload(dir.path(), "../my sheet.pdf", b"%PDF-1.5".to_vec())
            .await
            .unwrap();
        assert_eq!(staged.kind(), FileKind::Pdf);
        assert_eq!(staged.filename(), "my_sheet.pdf");
        assert!(staged.path().starts_with(dir.path()));
        assert!(staged.path().to_string_lossy().ends_with(".pdf"));
        assert_eq!(staged_files(dir.path()).unwrap().len(), 1);

        drop(staged);
        assert!(staged_files(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_upload_leaves_nothing_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = stage_upload(dir.path(), "notes.txt", b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, SolverError::UnsupportedFileType { .. }));
        assert!(staged_files(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsafe_only_name_counts_as_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = stage_upload(dir.path(), "///", Vec::new()).await.unwrap_err();
        assert!(matches!(err, SolverError::NoFileUploaded));
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = stage_upload(dir.path(), "hw.png", vec![1u8]).await.unwrap();
        let b = stage_upload(dir.path(), "hw.png", vec![2u8]).await.unwrap();
        assert_ne!(a.path(), b.path());
    }
}
