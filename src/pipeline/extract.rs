//! Text extraction: produce raw text from a staged upload.
//!
//! Two implementations of [`TextExtractor`], picked by [`FileKind`]:
//!
//! * [`TesseractOcr`]: decode the image, normalise it to grayscale PNG and
//!   run the `tesseract` executable on it. Layout is not preserved.
//! * [`PdfTextExtractor`]: read the text layer of every page with lopdf and
//!   concatenate it in page order. One bad page fails the whole document.
//!
//! Image decoding and lopdf are blocking, CPU-bound work; both run inside
//! `spawn_blocking` so request handlers never stall a runtime worker.

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::pipeline::upload::FileKind;
use futures::future::BoxFuture;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits};
use lopdf::Document;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

/// Capability: produce raw text from a file on disk.
///
/// Implementations must be `Send + Sync`; one instance serves every request.
pub trait TextExtractor: Send + Sync {
    fn extract<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String, SolverError>>;
}

/// The pair of extractors the upload handler dispatches between.
#[derive(Clone)]
pub struct Extractors {
    pub image: Arc<dyn TextExtractor>,
    pub pdf: Arc<dyn TextExtractor>,
}

impl Extractors {
    /// Use the overrides from `config` where present, else the built-in
    /// tesseract and lopdf extractors.
    pub fn from_config(config: &SolverConfig) -> Self {
        let image = config.image_extractor.clone().unwrap_or_else(|| {
            Arc::new(TesseractOcr::new(
                config.tesseract_path.clone(),
                Duration::from_secs(config.ocr_timeout_secs),
                config.max_image_alloc_bytes,
            )) as Arc<dyn TextExtractor>
        });
        let pdf = config
            .pdf_extractor
            .clone()
            .unwrap_or_else(|| Arc::new(PdfTextExtractor) as Arc<dyn TextExtractor>);
        Self { image, pdf }
    }

    pub fn for_kind(&self, kind: FileKind) -> &Arc<dyn TextExtractor> {
        match kind {
            FileKind::Image => &self.image,
            FileKind::Pdf => &self.pdf,
        }
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// OCR through the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pub executable: PathBuf,
    pub timeout: Duration,
    pub max_alloc_bytes: u64,
}

impl TesseractOcr {
    pub fn new(executable: PathBuf, timeout: Duration, max_alloc_bytes: u64) -> Self {
        Self {
            executable,
            timeout,
            max_alloc_bytes,
        }
    }

    async fn run(&self, path: &Path) -> Result<String, SolverError> {
        let src = path.to_path_buf();
        let max_alloc = self.max_alloc_bytes;
        let png = tokio::task::spawn_blocking(move || prepare_ocr_input(&src, max_alloc))
            .await
            .map_err(|e| SolverError::Internal(format!("Image task panicked: {e}")))??;

        let mut command = Command::new(&self.executable);
        command
            .arg(png.path())
            .arg("stdout")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| SolverError::OcrTimeout {
                path: path.to_path_buf(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| SolverError::OcrFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SolverError::OcrFailed {
                path: path.to_path_buf(),
                detail: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        info!("OCR produced {} chars from {}", text.len(), path.display());
        Ok(text)
    }
}

impl TextExtractor for TesseractOcr {
    fn extract<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String, SolverError>> {
        Box::pin(self.run(path))
    }
}

/// Decode `path` under an allocation limit and write it back out as a
/// grayscale PNG scratch file for tesseract.
fn prepare_ocr_input(path: &Path, max_alloc_bytes: u64) -> Result<NamedTempFile, SolverError> {
    let image = decode_image(path, max_alloc_bytes)?;
    debug!(
        "Decoded {} → {}x{} px",
        path.display(),
        image.width(),
        image.height()
    );

    let gray = DynamicImage::ImageLuma8(image.to_luma8());
    let mut buf = Vec::new();
    gray.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| SolverError::Internal(format!("PNG encoding failed: {e}")))?;

    let mut scratch = tempfile::Builder::new()
        .prefix("ocr-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| SolverError::Internal(format!("tempfile: {e}")))?;
    scratch
        .write_all(&buf)
        .map_err(|e| SolverError::Internal(format!("tempfile write: {e}")))?;
    Ok(scratch)
}

/// Open and decode an image, refusing allocations above `max_alloc_bytes`.
pub fn decode_image(path: &Path, max_alloc_bytes: u64) -> Result<DynamicImage, SolverError> {
    let decode_err = |detail: String| SolverError::ImageDecodeFailed {
        path: path.to_path_buf(),
        detail,
    };

    let mut reader = ImageReader::open(path)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_alloc = Some(max_alloc_bytes);
    reader.limits(limits);

    reader.decode().map_err(|e| match e {
        ImageError::Limits(limit) => SolverError::ImageTooLarge {
            path: path.to_path_buf(),
            detail: limit.to_string(),
        },
        other => decode_err(other.to_string()),
    })
}

// ── PDF text layer ───────────────────────────────────────────────────────

/// Concatenated page text via lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String, SolverError>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&path))
                .await
                .map_err(|e| SolverError::Internal(format!("PDF task panicked: {e}")))?
        })
    }
}

/// Blocking implementation of PDF text extraction.
pub fn extract_pdf_text_blocking(path: &Path) -> Result<String, SolverError> {
    let document = Document::load(path).map_err(|e| SolverError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let pages = document.get_pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut text = String::new();
    for &page_num in pages.keys() {
        let page_text = document
            .extract_text(&[page_num])
            .map_err(|e| SolverError::PdfTextFailed {
                page: page_num,
                detail: e.to_string(),
            })?;
        debug!("Page {}: {} chars", page_num, page_text.len());
        text.push_str(&page_text);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};

    #[test]
    fn decode_rejects_garbage() {
        let mut f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        f.write_all(b"definitely not a png").unwrap();
        let err = decode_image(f.path(), 64 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, SolverError::ImageDecodeFailed { .. }), "got: {err}");
    }

    #[test]
    fn decode_respects_alloc_limit() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(200, 200));
        let f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        img.save_with_format(f.path(), ImageFormat::Png).unwrap();

        let err = decode_image(f.path(), 1024).unwrap_err();
        assert!(matches!(err, SolverError::ImageTooLarge { .. }), "got: {err}");
    }

    #[test]
    fn ocr_input_is_grayscale_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(8, 4));
        let f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        img.save_with_format(f.path(), ImageFormat::Png).unwrap();

        let scratch = prepare_ocr_input(f.path(), 64 * 1024 * 1024).unwrap();
        let decoded = image::open(scratch.path()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
        let luma = decoded.to_luma8();
        assert_eq!(*luma.get_pixel(0, 0), Luma([0u8]));
    }

    #[tokio::test]
    async fn missing_tesseract_is_an_ocr_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        img.save_with_format(f.path(), ImageFormat::Png).unwrap();

        let ocr = TesseractOcr::new(
            PathBuf::from("/nonexistent/tesseract-binary"),
            Duration::from_secs(5),
            64 * 1024 * 1024,
        );
        let err = ocr.extract(f.path()).await.unwrap_err();
        assert!(matches!(err, SolverError::OcrFailed { .. }), "got: {err}");
    }

    #[test]
    fn corrupt_pdf_is_reported() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"%PDF-1.5\nthis is not a real document").unwrap();
        let err = extract_pdf_text_blocking(f.path()).unwrap_err();
        assert!(matches!(err, SolverError::CorruptPdf { .. }), "got: {err}");
    }

    #[test]
    fn pdf_text_round_trip() {
        let bytes = crate::pipeline::render::render_pdf(&crate::pipeline::render::layout_blocks(
            "Solutions:",
            &["F = ma".to_string()],
        ))
        .unwrap();
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(&bytes).unwrap();

        let text = extract_pdf_text_blocking(f.path()).unwrap();
        assert!(text.contains("Solutions:"), "got: {text:?}");
        assert!(text.contains("F = ma"), "got: {text:?}");
    }
}
