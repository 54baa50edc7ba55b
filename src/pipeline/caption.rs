//! Image captions via a vision LLM.
//!
//! The batch pipeline is synchronous, while edgequake-llm providers are
//! async. [`VlmCaptioner`] owns a current-thread tokio runtime and blocks on
//! each call, so no other part of the crate needs an executor.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^attempt`) with 500 ms base and 2 retries waits
//! 500 ms → 1 s before the image is given up on and left uncaptioned.

use crate::config::BatchConfig;
use crate::error::{BatchError, CaptionError};
use crate::output::ExtractedImage;
use crate::pipeline::encode::{sniff_format, to_image_data};
use crate::pipeline::postprocess::clean_caption;
use crate::prompts::{caption_request, DEFAULT_CAPTION_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Default caption model when only a provider name is given.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Produces a short textual description of one image.
pub trait Captioner {
    fn caption(&self, image: &ExtractedImage) -> Result<String, CaptionError>;
}

/// [`Captioner`] backed by an edgequake-llm vision provider.
pub struct VlmCaptioner {
    provider: Arc<dyn LLMProvider>,
    runtime: Runtime,
    prompt: String,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl VlmCaptioner {
    /// Resolve the provider from `config` and build a captioner around it.
    pub fn from_config(config: &BatchConfig) -> Result<Self, BatchError> {
        let provider = resolve_provider(config)?;
        Self::with_provider(provider, config)
    }

    pub fn with_provider(
        provider: Arc<dyn LLMProvider>,
        config: &BatchConfig,
    ) -> Result<Self, BatchError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BatchError::Internal(format!("Failed to start caption runtime: {}", e)))?;

        Ok(Self {
            provider,
            runtime,
            prompt: config
                .caption_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_CAPTION_PROMPT.to_string()),
            options: build_options(config),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    async fn caption_async(&self, image: &ExtractedImage) -> Result<String, CaptionError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.prompt.as_str()),
            ChatMessage::user_with_images(
                caption_request(image.page, image.index),
                vec![to_image_data(image)],
            ),
        ];

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Page {} image {}: retry {}/{} after {}ms",
                    image.page, image.index, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&self.options)).await {
                Ok(response) => {
                    debug!(
                        "Page {} image {}: {} input tokens, {} output tokens, {:?}",
                        image.page,
                        image.index,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    let caption = clean_caption(&response.content);
                    if caption.is_empty() {
                        return Err(CaptionError::EmptyResponse {
                            page: image.page,
                            index: image.index,
                        });
                    }
                    return Ok(caption);
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!(
                        "Page {} image {}: attempt {} failed: {}",
                        image.page,
                        image.index,
                        attempt + 1,
                        err_msg
                    );
                    last_err = Some(err_msg);
                }
            }
        }

        Err(CaptionError::LlmFailed {
            page: image.page,
            index: image.index,
            retries: self.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

impl Captioner for VlmCaptioner {
    fn caption(&self, image: &ExtractedImage) -> Result<String, CaptionError> {
        check_image(image)?;
        self.runtime.block_on(self.caption_async(image))
    }
}

/// Reject images whose bytes do not match their declared format before
/// spending a network call on them.
pub fn check_image(image: &ExtractedImage) -> Result<(), CaptionError> {
    match sniff_format(&image.data) {
        Some(found) if found == image.format => Ok(()),
        found => Err(CaptionError::UnsupportedFormat {
            page: image.page,
            index: image.index,
            format: found
                .map(|f| f.mime().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }),
    }
}

fn build_options(config: &BatchConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, BatchError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        BatchError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the caption provider, from most-specific to least-specific:
///
/// 1. `config.provider`, a pre-built provider used as-is
/// 2. `config.provider_name` + `config.model` (default `gpt-4.1-nano`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. `OPENAI_API_KEY` present → OpenAI
/// 5. [`ProviderFactory::from_env`] auto-detection
pub fn resolve_provider(config: &BatchConfig) -> Result<Arc<dyn LLMProvider>, BatchError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| BatchError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ImageFormat;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn build_options_defaults() {
        let config = BatchConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(300));
    }

    #[test]
    fn check_image_accepts_matching_format() {
        let img = ExtractedImage::new(1, 0, PNG_MAGIC.to_vec(), ImageFormat::Png);
        assert!(check_image(&img).is_ok());
    }

    #[test]
    fn check_image_rejects_mismatch() {
        let img = ExtractedImage::new(2, 1, PNG_MAGIC.to_vec(), ImageFormat::Jpeg);
        match check_image(&img).unwrap_err() {
            CaptionError::UnsupportedFormat { page, index, format } => {
                assert_eq!((page, index), (2, 1));
                assert_eq!(format, "image/png");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn check_image_rejects_unknown_bytes() {
        let img = ExtractedImage::new(1, 0, b"GIF89a".to_vec(), ImageFormat::Png);
        assert!(matches!(
            check_image(&img),
            Err(CaptionError::UnsupportedFormat { .. })
        ));
    }
}
