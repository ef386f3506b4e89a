//! # edgequake-solver
//!
//! Upload a photographed or PDF problem sheet, get every question back with
//! a step-by-step LaTeX solution, and download the solutions as a PDF.
//!
//! The crate is glue: OCR is tesseract, PDF text comes from lopdf, the
//! solving is an LLM reached through `edgequake-llm`, and the output PDF is
//! assembled with lopdf. What it adds is the request flow and a tagged error
//! type that tells bad input apart from resource limits and upstream
//! failures.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /upload (multipart "file")
//!  │
//!  ├─ 1. Stage    sanitise name, write to upload dir (deleted after step 2)
//!  ├─ 2. Extract  .png/.jpg/.jpeg → tesseract, .pdf → page text
//!  ├─ 3. Problems one LLM call, reply split into lines
//!  ├─ 4. Solve    one LLM call per problem, order preserved
//!  └─ 5. Respond  {"problems": [...], "solutions": [...]}
//!
//! POST /download-solutions-pdf {"solutions": [...]}
//!  └─ title + one "$$ … $$" paragraph per solution → solutions.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_solver::{server, SolverConfig, SolverContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OPENAI_API_KEY (or another provider key) is read here.
//!     let ctx = SolverContext::new(SolverConfig::default()).await?;
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     server::serve(listener, Arc::new(ctx), async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `solver-server` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod solve;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SolverConfig, SolverConfigBuilder};
pub use error::{ErrorKind, SolverError};
pub use output::{DownloadRequest, SolveOutput, SolveStats, UploadResponse};
pub use pipeline::extract::{PdfTextExtractor, TesseractOcr, TextExtractor};
pub use pipeline::llm::{ChatBackend, ChatReply, ProviderBackend};
pub use solve::{solve_text, solve_upload, SolverContext};
