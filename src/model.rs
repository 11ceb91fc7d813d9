//! The language-model seam: one narrow trait between the pipeline and the
//! outside world.
//!
//! The pipeline only ever needs one capability from a model: submit a prompt
//! (optionally with a page image) and receive text back. [`ChatModel`]
//! captures exactly that, so the extraction and cleanup stages are testable
//! with a scripted in-memory model while production runs go through
//! [`ProviderModel`], a thin adapter over `edgequake-llm` providers.
//!
//! Provider resolution follows a most-specific-first chain: an injected
//! model (tests, middleware) wins over a named provider, which wins over
//! environment auto-detection.

use crate::config::ConversionConfig;
use crate::error::PdfMillError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A single model invocation: prompt text plus an optional page image.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The full prompt text (interpretation or cleanup instructions).
    pub prompt: String,
    /// Base64-encoded page image, present only for vision calls.
    pub image: Option<ImageData>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens the model may generate.
    pub max_tokens: usize,
}

/// The model's reply, with token usage when the provider reports it.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Errors from a single model call. All variants are treated as transient
/// and retried with backoff; classification beyond that is not needed
/// because the retry budget is small and bounded.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The call did not complete within the configured timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider returned an error (rate limit, 5xx, malformed response).
    #[error("model API error: {0}")]
    Api(String),
}

/// Submit a prompt (plus optional image) and receive text.
///
/// Implementations must be `Send + Sync`; the pipeline holds them behind
/// `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, ModelError>;
}

/// Production [`ChatModel`] backed by an `edgequake-llm` provider.
///
/// The model identifier is baked into the provider at construction time, so
/// a run resolves two of these: one for the vision model and one for the
/// cleanup model.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    timeout_secs: u64,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout_secs: u64) -> Self {
        Self {
            provider,
            timeout_secs,
        }
    }
}

#[async_trait]
impl ChatModel for ProviderModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, ModelError> {
        let messages = match request.image {
            Some(image) => vec![ChatMessage::user_with_images(&request.prompt, vec![image])],
            None => vec![ChatMessage::user(&request.prompt)],
        };

        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let call = self.provider.chat(&messages, Some(&options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| ModelError::Timeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| ModelError::Api(e.to_string()))?;

        Ok(ChatReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

/// The two model handles a run needs: page interpretation and final cleanup.
#[derive(Clone)]
pub struct ResolvedModels {
    pub vision: Arc<dyn ChatModel>,
    pub cleanup: Arc<dyn ChatModel>,
}

/// Resolve the vision and cleanup models, most-specific first:
///
/// 1. **Injected model** (`config.chat_override`) — the caller supplied a
///    ready [`ChatModel`]; it serves both roles. Used by tests and by
///    callers that need custom middleware.
/// 2. **Named provider** (`config.provider_name`) — instantiate the named
///    provider once per model identifier; the factory reads the matching
///    API key (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …) from the
///    environment.
/// 3. **OpenAI key present** — prefer OpenAI explicitly so users with
///    multiple provider keys get a deterministic default.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — scan known
///    key variables and take the first available provider. The factory's
///    default model is used for both roles in this case.
///
/// A failure here is a configuration error and aborts the run before any
/// page is processed.
pub fn resolve_models(config: &ConversionConfig) -> Result<ResolvedModels, PdfMillError> {
    if let Some(ref chat) = config.chat_override {
        return Ok(ResolvedModels {
            vision: Arc::clone(chat),
            cleanup: Arc::clone(chat),
        });
    }

    if let Some(ref name) = config.provider_name {
        return Ok(ResolvedModels {
            vision: named_model(name, &config.vision_model, config.api_timeout_secs)?,
            cleanup: named_model(name, &config.cleanup_model, config.api_timeout_secs)?,
        });
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            return Ok(ResolvedModels {
                vision: named_model("openai", &config.vision_model, config.api_timeout_secs)?,
                cleanup: named_model("openai", &config.cleanup_model, config.api_timeout_secs)?,
            });
        }
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PdfMillError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from the environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    let model: Arc<dyn ChatModel> = Arc::new(ProviderModel::new(
        provider,
        config.api_timeout_secs,
    ));
    Ok(ResolvedModels {
        vision: Arc::clone(&model),
        cleanup: model,
    })
}

/// Instantiate a named provider with a specific model identifier.
fn named_model(
    provider_name: &str,
    model: &str,
    timeout_secs: u64,
) -> Result<Arc<dyn ChatModel>, PdfMillError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PdfMillError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(ProviderModel::new(provider, timeout_secs)))
}
