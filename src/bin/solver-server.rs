//! HTTP server binary for edgequake-solver.
//!
//! A thin shim over the library crate that maps CLI flags to `SolverConfig`
//! and serves the router until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_solver::{server, SolverConfig, SolverContext};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "solver-server",
    version,
    about = "Extract questions from an uploaded image or PDF and solve them with an LLM",
    long_about = "Serves a small web app: upload a PNG/JPEG/PDF problem sheet, get every \
question back with a LaTeX solution, and download the solutions as a PDF.\n\n\
The LLM credential is read from the environment (OPENAI_API_KEY, ANTHROPIC_API_KEY, …), \
which may be populated from a .env file in the working directory."
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "SOLVER_BIND", default_value = "0.0.0.0:5000")]
    bind: String,

    /// Directory for staged uploads (created if missing).
    #[arg(long, env = "SOLVER_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// LLM provider: openai, anthropic, gemini, ollama, … (auto-detected if omitted).
    #[arg(long, env = "SOLVER_PROVIDER")]
    provider: Option<String>,

    /// LLM model used for extraction and solving.
    #[arg(short, long, env = "SOLVER_MODEL", default_value = edgequake_solver::config::DEFAULT_MODEL)]
    model: String,

    /// Solve calls in flight at once (1 = sequential).
    #[arg(short, long, env = "SOLVER_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Sampling temperature (provider default if omitted).
    #[arg(long, env = "SOLVER_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max tokens per completion (provider default if omitted).
    #[arg(long, env = "SOLVER_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, env = "SOLVER_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Per-OCR-run timeout in seconds.
    #[arg(long, env = "SOLVER_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Path to the tesseract executable.
    #[arg(long, env = "SOLVER_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "SOLVER_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,

    /// Debug logging.
    #[arg(short, long, env = "SOLVER_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, env = "SOLVER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` first, so the SOLVER_* fallbacks can come from it too.
    let env_file = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;

    // ── Resolve provider + upload dir ────────────────────────────────────
    let ctx = SolverContext::new(config)
        .await
        .context("Failed to initialise solver")?;

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;

    server::serve(listener, Arc::new(ctx), shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down cleanly");
    Ok(())
}

fn build_config(cli: &Cli) -> Result<SolverConfig> {
    let mut builder = SolverConfig::builder()
        .upload_dir(&cli.upload_dir)
        .model(&cli.model)
        .solve_concurrency(cli.concurrency)
        .api_timeout_secs(cli.api_timeout)
        .ocr_timeout_secs(cli.ocr_timeout)
        .tesseract_path(&cli.tesseract)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl-C received, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_file_feeds_flag_fallbacks() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "SOLVER_MODEL=gpt-4o-mini").unwrap();
        writeln!(f, "SOLVER_CONCURRENCY=3").unwrap();
        dotenvy::from_path(f.path()).unwrap();

        let cli = Cli::try_parse_from(["solver-server"]).unwrap();
        assert_eq!(cli.model, "gpt-4o-mini");
        let config = build_config(&cli).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.solve_concurrency, 3);
    }
}
