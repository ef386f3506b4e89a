//! Upload-to-solutions orchestration.
//!
//! ```text
//! upload ──▶ stage ──▶ extract text ──▶ extract problems ──▶ solve ──▶ output
//!           (tempfile)  (tesseract/lopdf)     (1 LLM call)     (N LLM calls)
//! ```
//!
//! The staged file is dropped, and therefore deleted, as soon as text
//! extraction returns, before any LLM call is made.

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::output::{SolveOutput, SolveStats};
use crate::pipeline::extract::Extractors;
use crate::pipeline::llm::{self, ChatBackend};
use crate::pipeline::upload;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Everything a request needs, resolved once at startup.
#[derive(Clone)]
pub struct SolverContext {
    pub config: SolverConfig,
    pub backend: Arc<dyn ChatBackend>,
    pub extractors: Extractors,
}

impl SolverContext {
    /// Resolve the LLM backend and extractors and create the upload directory.
    pub async fn new(config: SolverConfig) -> Result<Self, SolverError> {
        upload::ensure_upload_dir(&config.upload_dir).await?;
        let backend = llm::resolve_backend(&config)?;
        let extractors = Extractors::from_config(&config);
        debug!("Solver context ready: {:?}", config);
        Ok(Self {
            config,
            backend,
            extractors,
        })
    }
}

/// Stage an upload, extract its text, then find and solve its problems.
pub async fn solve_upload<B>(
    filename: &str,
    bytes: B,
    ctx: &SolverContext,
) -> Result<SolveOutput, SolverError>
where
    B: AsRef<[u8]> + Send + 'static,
{
    let total_start = Instant::now();

    let extract_start = Instant::now();
    let text = {
        let staged = upload::stage_upload(&ctx.config.upload_dir, filename, bytes).await?;
        let text = ctx
            .extractors
            .for_kind(staged.kind())
            .extract(staged.path())
            .await?;
        info!(
            "Text extracted from '{}': {}...",
            staged.filename(),
            preview(&text, 100)
        );
        text
    };
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let mut output = solve_text(&text, ctx.backend.as_ref(), &ctx.config).await?;
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Find and solve the problems in already-extracted `text`.
pub async fn solve_text(
    text: &str,
    backend: &dyn ChatBackend,
    config: &SolverConfig,
) -> Result<SolveOutput, SolverError> {
    let llm_start = Instant::now();
    let (problems, extract_usage) = llm::extract_problems(backend, text, config).await?;
    debug!("Problems extracted: {:?}", problems);

    let (solutions, solve_usage) = llm::solve_problems(backend, &problems, config).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let stats = SolveStats {
        extracted_chars: text.chars().count(),
        llm_calls: extract_usage.calls + solve_usage.calls,
        total_input_tokens: extract_usage.input_tokens + solve_usage.input_tokens,
        total_output_tokens: extract_usage.output_tokens + solve_usage.output_tokens,
        extract_duration_ms: 0,
        llm_duration_ms,
        total_duration_ms: llm_duration_ms,
    };
    info!(
        "Solved {}/{} problems with {} LLM calls in {}ms",
        solutions.len(),
        problems.len(),
        stats.llm_calls,
        llm_duration_ms
    );

    Ok(SolveOutput {
        problems,
        solutions,
        stats,
    })
}

/// First `max_chars` characters of `text`, on a char boundary.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
