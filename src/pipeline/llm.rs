//! LLM interaction: question extraction and per-problem solving.
//!
//! All model access goes through [`ChatBackend`], a one-method seam over a
//! single system+user chat turn. [`ProviderBackend`] implements it on top of
//! any `edgequake_llm` provider; tests plug in deterministic stubs.
//!
//! Prompts live in [`crate::prompts`]. There is no retry here: a failed call
//! fails the request.

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::pipeline::postprocess::{clean_solution, split_problems};
use crate::prompts::{extract_prompt, solve_prompt, EXTRACT_SYSTEM_PROMPT, SOLVE_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// One completed chat turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ChatReply {
    /// A reply with no token accounting.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A model that answers one system+user exchange with one completion.
pub trait ChatBackend: Send + Sync {
    fn chat<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<ChatReply, SolverError>>;
}

/// [`ChatBackend`] over an `edgequake_llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SolverConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

impl ChatBackend for ProviderBackend {
    fn chat<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<ChatReply, SolverError>> {
        Box::pin(async move {
            let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| SolverError::LlmApiError {
                    message: e.to_string(),
                })?;
            Ok(ChatReply {
                content: response.content,
                input_tokens: response.prompt_tokens as u64,
                output_tokens: response.completion_tokens as u64,
            })
        })
    }
}

/// Build `CompletionOptions` from the solver config.
fn build_options(config: &SolverConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        ..Default::default()
    }
}

/// Resolve the chat backend, from most-specific to least-specific:
///
/// 1. **Pre-built backend** (`config.backend`): used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **OpenAI** when `OPENAI_API_KEY` is set, with `config.model`.
/// 4. **Auto-detection** via `ProviderFactory::from_env`.
///
/// Called once at startup; the credential is read from the environment here.
pub fn resolve_backend(config: &SolverConfig) -> Result<Arc<dyn ChatBackend>, SolverError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let provider = if let Some(ref name) = config.provider_name {
        create_provider(name, &config.model)?
    } else if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        create_provider("openai", &config.model)?
    } else {
        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| SolverError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                    Error: {}",
                    e
                ),
            })?;
        llm_provider
    };

    Ok(Arc::new(ProviderBackend::new(provider, config)))
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SolverError> {
    info!("Using LLM provider '{}' with model '{}'", name, model);
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        SolverError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Token usage summed over a batch of calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub calls: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    fn add(&mut self, reply: &ChatReply) {
        self.calls += 1;
        self.input_tokens += reply.input_tokens;
        self.output_tokens += reply.output_tokens;
    }
}

/// One chat turn bounded by `timeout_secs`.
async fn call(
    backend: &dyn ChatBackend,
    system: &str,
    user: &str,
    timeout_secs: u64,
) -> Result<ChatReply, SolverError> {
    let start = Instant::now();
    let reply = timeout(Duration::from_secs(timeout_secs), backend.chat(system, user))
        .await
        .map_err(|_| SolverError::LlmTimeout { secs: timeout_secs })??;
    debug!(
        "{} input tokens, {} output tokens, {:?}",
        reply.input_tokens,
        reply.output_tokens,
        start.elapsed()
    );
    Ok(reply)
}

/// Ask the model to list the questions in `text`, one per line.
///
/// Returns the non-blank, trimmed lines of the reply in order. An empty
/// list is a valid result.
pub async fn extract_problems(
    backend: &dyn ChatBackend,
    text: &str,
    config: &SolverConfig,
) -> Result<(Vec<String>, Usage), SolverError> {
    let reply = call(
        backend,
        EXTRACT_SYSTEM_PROMPT,
        &extract_prompt(text),
        config.api_timeout_secs,
    )
    .await?;

    let mut usage = Usage::default();
    usage.add(&reply);
    let problems = split_problems(&reply.content);
    info!("Problems extracted: {}", problems.len());
    Ok((problems, usage))
}

/// Solve every problem with an independent call; `solutions[i]` answers
/// `problems[i]`.
///
/// At most `config.solve_concurrency` calls are in flight (1 = one after
/// another). The first failure aborts the batch and nothing is returned.
pub async fn solve_problems(
    backend: &dyn ChatBackend,
    problems: &[String],
    config: &SolverConfig,
) -> Result<(Vec<String>, Usage), SolverError> {
    let total = problems.len();
    let secs = config.api_timeout_secs;
    // Owned prompts: the in-flight futures must not borrow per-item data.
    let prompts: Vec<String> = problems.iter().map(|p| solve_prompt(p)).collect();
    let replies: Vec<ChatReply> = stream::iter(prompts.into_iter().enumerate().map(|(i, user)| {
        async move {
            debug!("Solving problem {}/{}", i + 1, total);
            call(backend, SOLVE_SYSTEM_PROMPT, &user, secs).await
        }
    }))
    .buffered(config.solve_concurrency.max(1))
    .try_collect()
    .await?;

    let mut usage = Usage::default();
    let solutions = replies
        .iter()
        .map(|reply| {
            usage.add(reply);
            clean_solution(&reply.content)
        })
        .collect();
    info!("Solved {} problems", total);
    Ok((solutions, usage))
}
