//! Error types for the edgequake-solver library.
//!
//! Every fatal failure is a [`SolverError`]. Variants are grouped into an
//! [`ErrorKind`] so the HTTP layer can pick a status code without matching
//! on every variant:
//!
//! * [`ErrorKind::InvalidInput`]: the request itself is wrong (no file,
//!   unsupported extension, empty solutions list). Reported as a client error.
//! * [`ErrorKind::ResourceLimit`]: the upload or decoded image is too large
//!   for the configured limits. Reported with a dedicated message.
//! * [`ErrorKind::Upstream`]: OCR, PDF parsing, the LLM provider or the PDF
//!   builder failed.
//! * [`ErrorKind::Internal`]: local I/O or configuration problems.
//!
//! There is no partial-success type: a failure on any problem discards the
//! whole batch.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`SolverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ResourceLimit,
    Upstream,
    Internal,
}

/// All fatal errors returned by the edgequake-solver library.
#[derive(Debug, Error)]
pub enum SolverError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The multipart request had no `file` field, or its filename was empty.
    #[error("No file uploaded")]
    NoFileUploaded,

    /// The file extension is not one of png, jpg, jpeg or pdf.
    #[error("Unsupported file type: '{filename}'")]
    UnsupportedFileType { filename: String },

    /// The download request carried no solutions.
    #[error("No solutions provided")]
    NoSolutions,

    /// The request body could not be read or parsed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Resource limits ───────────────────────────────────────────────────
    /// A request body exceeded `max_upload_bytes`.
    #[error("Request body exceeds the {limit} byte limit")]
    UploadTooLarge { limit: usize },

    /// Decoding the image would exceed `max_image_alloc_bytes`.
    #[error("Image '{path}' is too large to decode: {detail}")]
    ImageTooLarge { path: PathBuf, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The image could not be opened or decoded.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    /// The tesseract process could not be started or exited with an error.
    #[error("OCR failed for '{path}': {detail}\nIs tesseract installed? Set --tesseract to its path.")]
    OcrFailed { path: PathBuf, detail: String },

    /// The tesseract process did not finish in time.
    #[error("OCR timed out after {secs}s for '{path}'")]
    OcrTimeout { path: PathBuf, secs: u64 },

    /// The PDF could not be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Text extraction failed on a specific page.
    #[error("Text extraction failed for page {page}: {detail}")]
    PdfTextFailed { page: u32, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM API call did not finish in time.
    #[error("LLM call timed out after {secs}s")]
    LlmTimeout { secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the solutions PDF failed.
    #[error("Failed to render solutions PDF: {0}")]
    PdfRenderFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write or re-open the staged upload.
    #[error("Failed to stage upload in '{dir}': {source}")]
    UploadWriteFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SolverError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::NoFileUploaded
            | SolverError::UnsupportedFileType { .. }
            | SolverError::NoSolutions
            | SolverError::InvalidRequest(_) => ErrorKind::InvalidInput,

            SolverError::UploadTooLarge { .. } | SolverError::ImageTooLarge { .. } => {
                ErrorKind::ResourceLimit
            }

            SolverError::ImageDecodeFailed { .. }
            | SolverError::OcrFailed { .. }
            | SolverError::OcrTimeout { .. }
            | SolverError::CorruptPdf { .. }
            | SolverError::PdfTextFailed { .. }
            | SolverError::ProviderNotConfigured { .. }
            | SolverError::LlmApiError { .. }
            | SolverError::LlmTimeout { .. }
            | SolverError::PdfRenderFailed(_) => ErrorKind::Upstream,

            SolverError::UploadWriteFailed { .. }
            | SolverError::InvalidConfig(_)
            | SolverError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to HTTP clients.
    ///
    /// Upstream and internal details stay in the server log.
    pub fn public_message(&self) -> &'static str {
        match self {
            SolverError::NoFileUploaded => "No file uploaded",
            SolverError::UnsupportedFileType { .. } => "Unsupported file type",
            SolverError::NoSolutions => "No solutions provided",
            SolverError::InvalidRequest(_) => "Invalid request",
            _ => match self.kind() {
                ErrorKind::ResourceLimit => "Server out of memory",
                _ => "Internal server error",
            },
        }
    }
}
