//! HTTP surface.
//!
//! | Route | Success | Failure |
//! |-------|---------|---------|
//! | `GET /` | landing page | n/a |
//! | `POST /upload` | `{"problems": [...], "solutions": [...]}` | `{"error": "..."}`, 400 or 500 |
//! | `POST /download-solutions-pdf` | `solutions.pdf` attachment | plain text, 400 or 500 |
//!
//! Handlers return `Result<_, SolverError>` wrapped in a response adapter;
//! error details go to the log, clients only see
//! [`SolverError::public_message`].

use crate::error::{ErrorKind, SolverError};
use crate::output::{DownloadRequest, ErrorBody, UploadResponse};
use crate::pipeline::render::render_solutions_pdf;
use crate::solve::{solve_upload, SolverContext};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared handler state.
pub type AppState = Arc<SolverContext>;

/// Build the router. The multipart body limit comes from
/// `config.max_upload_bytes`.
pub fn router(ctx: AppState) -> Router {
    let limit = ctx.config.max_upload_bytes;
    Router::new()
        .route("/", get(home))
        .route("/upload", post(upload_file))
        .route("/download-solutions-pdf", post(download_solutions_pdf))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(ctx)
}

/// Serve `router(ctx)` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, ctx: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn home() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn upload_file(
    State(ctx): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, JsonError> {
    let limit = ctx.config.max_upload_bytes;
    // Not a multipart body at all: there is no file to look for.
    let mut multipart = multipart.map_err(|_| SolverError::NoFileUploaded)?;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = match upload {
        Some((name, bytes)) if !name.is_empty() => (name, bytes),
        _ => return Err(SolverError::NoFileUploaded.into()),
    };

    let output = solve_upload(&filename, bytes, &ctx).await?;
    info!(
        "Upload '{}': {} problems, {} tokens in / {} out, {}ms",
        filename,
        output.problems.len(),
        output.stats.total_input_tokens,
        output.stats.total_output_tokens,
        output.stats.total_duration_ms
    );
    Ok(Json(output.into()))
}

async fn download_solutions_pdf(
    State(ctx): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, TextError> {
    let limit = ctx.config.max_upload_bytes;
    let Json(request) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return SolverError::UploadTooLarge { limit };
        }
        warn!("Unreadable download request: {}", e.body_text());
        SolverError::NoSolutions
    })?;
    let solutions = request.into_texts();
    if solutions.is_empty() {
        return Err(SolverError::NoSolutions.into());
    }

    let pdf = render_solutions_pdf(&ctx.config.pdf_title, solutions).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=solutions.pdf",
            ),
        ],
        pdf,
    )
        .into_response())
}

fn multipart_error(e: MultipartError, limit: usize) -> SolverError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SolverError::UploadTooLarge { limit }
    } else {
        SolverError::InvalidRequest(e.body_text())
    }
}

/// HTTP status for an error kind.
pub fn status_for(err: &SolverError) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ResourceLimit | ErrorKind::Upstream | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn log_error(context: &str, err: &SolverError) {
    match err.kind() {
        ErrorKind::InvalidInput => warn!("{}: {}", context, err),
        _ => error!("{}: {}", context, err),
    }
}

/// Error rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct JsonError(pub SolverError);

impl From<SolverError> for JsonError {
    fn from(err: SolverError) -> Self {
        Self(err)
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        log_error("Error processing file", &self.0);
        let body = ErrorBody {
            error: self.0.public_message().to_string(),
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Error rendered as plain text.
#[derive(Debug)]
pub struct TextError(pub SolverError);

impl From<SolverError> for TextError {
    fn from(err: SolverError) -> Self {
        Self(err)
    }
}

impl IntoResponse for TextError {
    fn into_response(self) -> Response {
        log_error("Error generating PDF", &self.0);
        let status = status_for(&self.0);
        let message = if status == StatusCode::BAD_REQUEST {
            self.0.public_message()
        } else {
            "Internal Server Error"
        };
        (status, message).into_response()
    }
}
