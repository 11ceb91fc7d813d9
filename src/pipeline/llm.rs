//! Model calls: vision interpretation of MIXED pages and the cleanup pass.
//!
//! This module is intentionally thin — all prompt engineering lives in
//! [`crate::prompts`] so it can change without touching retry or
//! error-handling logic here.
//!
//! ## Retry strategy
//!
//! Rate limits, timeouts, and 5xx responses are transient and frequent.
//! Every call gets exponential backoff (`retry_backoff_ms * 2^attempt`):
//! with a 1 s base and 3 retries the wait sequence is 1 s → 2 s → 4 s.
//! After exhaustion the two paths diverge:
//!
//! * **Vision**: the page's content never existed in text form, so the
//!   result carries a [`PageError`] and becomes a visible placeholder.
//! * **Cleanup**: the chunk's content already exists, so we fall back to
//!   the raw, uncleaned chunk rather than losing it.

use crate::config::ConversionConfig;
use crate::error::PageError;
use crate::model::{ChatModel, ChatRequest, ChatReply, ModelError};
use crate::output::{ContentSource, PageResult};
use crate::prompts;
use edgequake_llm::ImageData;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Interpret a single rasterised MIXED page via the vision model.
///
/// Always returns a `PageResult` — never propagates the error upward, so a
/// single bad page doesn't abort the document. Callers check
/// `result.error` to decide between content and placeholder.
pub async fn interpret_page(
    vision: &Arc<dyn ChatModel>,
    index: usize,
    image: ImageData,
    config: &ConversionConfig,
) -> PageResult {
    let start = Instant::now();
    let page_num = index + 1;

    let request = ChatRequest {
        prompt: prompts::INTERPRETATION_PROMPT.to_string(),
        image: Some(image),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    match call_with_retries(vision, request, config, &format!("page {page_num}")).await {
        Ok((reply, retries)) => {
            let duration = start.elapsed();
            debug!(
                "Page {}: {} in / {} out tokens, {:?}",
                page_num, reply.prompt_tokens, reply.completion_tokens, duration
            );
            PageResult {
                index,
                markdown: reply.content,
                source: ContentSource::LlmVision,
                retries,
                duration_ms: duration.as_millis() as u64,
                input_tokens: reply.prompt_tokens,
                output_tokens: reply.completion_tokens,
                error: None,
            }
        }
        Err(e) => {
            let mut result = PageResult::failed(
                index,
                ContentSource::LlmVision,
                PageError::LlmFailed {
                    page: page_num,
                    retries: config.max_retries,
                    detail: e.to_string(),
                },
            );
            result.retries = config.max_retries;
            result.duration_ms = start.elapsed().as_millis() as u64;
            result
        }
    }
}

/// Outcome of cleaning one chunk.
#[derive(Debug, Clone)]
pub struct CleanupOutcome {
    /// Cleaned markdown, or the raw chunk when every attempt failed.
    pub markdown: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// True when the model could not be reached and the raw chunk was kept.
    pub fell_back: bool,
}

/// Run the cleanup pass over one chunk (or the whole document when
/// `total_parts` is 1).
pub async fn cleanup_chunk(
    cleanup: &Arc<dyn ChatModel>,
    chunk: &str,
    part: usize,
    total_parts: usize,
    config: &ConversionConfig,
) -> CleanupOutcome {
    let mut prompt = prompts::cleanup_prompt(chunk);
    if total_parts > 1 {
        prompt.push_str(&prompts::chunk_part_note(part, total_parts));
    }

    let request = ChatRequest {
        prompt,
        image: None,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let label = format!("cleanup {part}/{total_parts}");
    match call_with_retries(cleanup, request, config, &label).await {
        Ok((reply, _retries)) => CleanupOutcome {
            markdown: reply.content,
            input_tokens: reply.prompt_tokens,
            output_tokens: reply.completion_tokens,
            fell_back: false,
        },
        Err(e) => {
            warn!(
                "Cleanup {}/{} failed after {} retries ({}); keeping raw content",
                part, total_parts, config.max_retries, e
            );
            CleanupOutcome {
                markdown: chunk.to_string(),
                input_tokens: 0,
                output_tokens: 0,
                fell_back: true,
            }
        }
    }
}

/// Call the model with exponential backoff up to `config.max_retries`
/// retries. Returns the reply and the number of retries that were needed.
async fn call_with_retries(
    model: &Arc<dyn ChatModel>,
    request: ChatRequest,
    config: &ConversionConfig,
    label: &str,
) -> Result<(ChatReply, u32), ModelError> {
    let mut last_err: Option<ModelError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                label, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match model.complete(request.clone()).await {
            Ok(reply) => return Ok((reply, attempt)),
            Err(e) => {
                warn!("{}: attempt {} failed — {}", label, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ModelError::Api("unknown error".into())))
}
