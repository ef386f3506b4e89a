//! Configuration types for the upload → extract → solve → render service.
//!
//! Everything the request handlers need (LLM access, upload directory,
//! extractor overrides, limits) lives in [`SolverConfig`] and is passed in
//! explicitly; the crate keeps no module-level singletons.

use crate::error::SolverError;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::llm::ChatBackend;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default LLM model for both the extraction and the solving prompt.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default title placed at the top of the solutions PDF.
pub const DEFAULT_PDF_TITLE: &str = "Solutions:";

/// Configuration for the solver service.
///
/// Built via [`SolverConfig::builder()`] or using [`SolverConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_solver::SolverConfig;
///
/// let config = SolverConfig::builder()
///     .upload_dir("/tmp/solver-uploads")
///     .model("gpt-4.1-mini")
///     .solve_concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SolverConfig {
    /// Directory that holds staged uploads while text is extracted. Default: `uploads`.
    ///
    /// Created on startup if missing. Each upload gets a unique file name and
    /// is removed as soon as extraction finishes.
    pub upload_dir: PathBuf,

    /// LLM model identifier. Default: `gpt-4`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, OpenAI is used when `OPENAI_API_KEY` is set, otherwise
    /// `ProviderFactory::from_env()` picks one.
    pub provider_name: Option<String>,

    /// Pre-constructed chat backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn ChatBackend>>,

    /// Sampling temperature. None leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Maximum tokens per completion. None leaves the provider default in place.
    pub max_tokens: Option<usize>,

    /// Number of solve calls in flight at once. Default: 1 (strictly sequential).
    ///
    /// Solutions are always returned in problem order regardless of this value.
    pub solve_concurrency: usize,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Timeout for one tesseract run in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Path or name of the tesseract executable. Default: `tesseract`.
    pub tesseract_path: PathBuf,

    /// Replaces the tesseract-backed OCR extractor.
    pub image_extractor: Option<Arc<dyn TextExtractor>>,

    /// Replaces the lopdf-backed PDF text extractor.
    pub pdf_extractor: Option<Arc<dyn TextExtractor>>,

    /// Largest accepted upload body in bytes. Default: 25 MiB.
    pub max_upload_bytes: usize,

    /// Allocation ceiling for decoding an uploaded image. Default: 512 MiB.
    ///
    /// A small PNG can declare enormous dimensions; the decoder refuses to
    /// allocate past this limit instead of exhausting memory.
    pub max_image_alloc_bytes: u64,

    /// Title block of the generated solutions PDF. Default: `Solutions:`.
    pub pdf_title: String,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            backend: None,
            temperature: None,
            max_tokens: None,
            solve_concurrency: 1,
            api_timeout_secs: 120,
            ocr_timeout_secs: 120,
            tesseract_path: PathBuf::from("tesseract"),
            image_extractor: None,
            pdf_extractor: None,
            max_upload_bytes: 25 * 1024 * 1024,
            max_image_alloc_bytes: 512 * 1024 * 1024,
            pdf_title: DEFAULT_PDF_TITLE.to_string(),
        }
    }
}

impl fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfig")
            .field("upload_dir", &self.upload_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn ChatBackend>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("solve_concurrency", &self.solve_concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("tesseract_path", &self.tesseract_path)
            .field(
                "image_extractor",
                &self.image_extractor.as_ref().map(|_| "<dyn TextExtractor>"),
            )
            .field(
                "pdf_extractor",
                &self.pdf_extractor.as_ref().map(|_| "<dyn TextExtractor>"),
            )
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_image_alloc_bytes", &self.max_image_alloc_bytes)
            .field("pdf_title", &self.pdf_title)
            .finish()
    }
}

impl SolverConfig {
    /// Create a new builder for `SolverConfig`.
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SolverConfig`].
#[derive(Debug)]
pub struct SolverConfigBuilder {
    config: SolverConfig,
}

impl SolverConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn solve_concurrency(mut self, n: usize) -> Self {
        self.config.solve_concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn image_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.image_extractor = Some(extractor);
        self
    }

    pub fn pdf_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.pdf_extractor = Some(extractor);
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn max_image_alloc_bytes(mut self, n: u64) -> Self {
        self.config.max_image_alloc_bytes = n;
        self
    }

    pub fn pdf_title(mut self, title: impl Into<String>) -> Self {
        self.config.pdf_title = title.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SolverConfig, SolverError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(SolverError::InvalidConfig("Model must not be empty".into()));
        }
        if c.upload_dir.as_os_str().is_empty() {
            return Err(SolverError::InvalidConfig(
                "Upload directory must not be empty".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(SolverError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.ocr_timeout_secs == 0 {
            return Err(SolverError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SolverConfig::default();
        assert_eq!(c.model, "gpt-4");
        assert_eq!(c.solve_concurrency, 1);
        assert_eq!(c.upload_dir, PathBuf::from("uploads"));
        assert_eq!(c.pdf_title, "Solutions:");
        assert!(c.backend.is_none());
    }

    #[test]
    fn builder_clamps() {
        let c = SolverConfig::builder()
            .solve_concurrency(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.solve_concurrency, 1);
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn builder_rejects_empty_model() {
        let err = SolverConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, SolverError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = SolverConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(err.to_string().contains("Timeouts"));
    }

    #[test]
    fn debug_hides_backend() {
        let s = format!("{:?}", SolverConfig::default());
        assert!(s.contains("SolverConfig"));
        assert!(s.contains("gpt-4"));
    }
}
