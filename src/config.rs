//! Configuration types for folder-batch conversion.
//!
//! Every knob of a run lives in one immutable [`BatchConfig`], built via
//! [`BatchConfigBuilder`] and handed to the orchestrator at construction.
//! Nothing reads ambient global state during a run, so an orchestrator can be
//! exercised in isolation with fake collaborators and a temporary directory.

use crate::error::BatchError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default import root, relative to the working directory.
pub const DEFAULT_IMPORTS_DIR: &str = "imports";
/// Default export root, relative to the working directory.
pub const DEFAULT_EXPORTS_DIR: &str = "exports";
/// Default output filename for loose PDFs directly under the import root.
pub const DEFAULT_ROOT_OUTPUT: &str = "combined_documents.md";
/// Separator written between documents in a folder output.
pub const DEFAULT_SECTION_SEPARATOR: &str = "___";

/// Configuration for one batch run.
///
/// # Example
/// ```rust
/// use edgequake_pdfbatch::{BatchConfig, ImageHandling};
///
/// let config = BatchConfig::builder()
///     .imports_dir("docs/in")
///     .exports_dir("docs/out")
///     .image_handling(ImageHandling::EmbedOnly)
///     .build()
///     .unwrap();
/// assert!(!config.describes_images());
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory scanned for PDF folders and loose PDFs. Default: `imports/`.
    pub imports_dir: PathBuf,

    /// Directory receiving Markdown outputs and the run summary. Default: `exports/`.
    pub exports_dir: PathBuf,

    /// Output filename for the root group (loose PDFs). Default: `combined_documents.md`.
    ///
    /// Named folders always get `{folder}_{timestamp}.md`; this only renames
    /// the root group's file.
    pub root_output_name: String,

    /// What happens to images found in a PDF. Default: [`ImageHandling::Describe`].
    pub image_handling: ImageHandling,

    /// Marker inserted between pages of a multi-page document. Default: HTML comment.
    pub page_separator: PageSeparator,

    /// Separator written between documents in a folder file. Default: `___`.
    pub section_separator: String,

    /// Skip folders that already have a `{folder}_*.md` export. Default: false.
    pub skip_already_converted: bool,

    /// Caption model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// Caption provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed caption provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom caption prompt. If None, uses [`crate::prompts::DEFAULT_CAPTION_PROMPT`].
    pub caption_prompt: Option<String>,

    /// Sampling temperature for caption calls. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per caption. Default: 300.
    ///
    /// Captions are one or two sentences; the cap keeps a runaway model from
    /// inlining an essay into an image's alt text.
    pub max_tokens: usize,

    /// Retries per image on a transient caption failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Receives per-folder and per-file events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            imports_dir: PathBuf::from(DEFAULT_IMPORTS_DIR),
            exports_dir: PathBuf::from(DEFAULT_EXPORTS_DIR),
            root_output_name: DEFAULT_ROOT_OUTPUT.to_string(),
            image_handling: ImageHandling::default(),
            page_separator: PageSeparator::default(),
            section_separator: DEFAULT_SECTION_SEPARATOR.to_string(),
            skip_already_converted: false,
            model: None,
            provider_name: None,
            provider: None,
            caption_prompt: None,
            temperature: 0.2,
            max_tokens: 300,
            max_retries: 2,
            retry_backoff_ms: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("imports_dir", &self.imports_dir)
            .field("exports_dir", &self.exports_dir)
            .field("root_output_name", &self.root_output_name)
            .field("image_handling", &self.image_handling)
            .field("page_separator", &self.page_separator)
            .field("skip_already_converted", &self.skip_already_converted)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether the captioner should be invoked for extracted images.
    pub fn describes_images(&self) -> bool {
        self.image_handling == ImageHandling::Describe
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl fmt::Debug for BatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BatchConfigBuilder {
    pub fn imports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.imports_dir = dir.into();
        self
    }

    pub fn exports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.exports_dir = dir.into();
        self
    }

    pub fn root_output_name(mut self, name: impl Into<String>) -> Self {
        self.config.root_output_name = name.into();
        self
    }

    pub fn image_handling(mut self, handling: ImageHandling) -> Self {
        self.config.image_handling = handling;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn section_separator(mut self, sep: impl Into<String>) -> Self {
        self.config.section_separator = sep.into();
        self
    }

    pub fn skip_already_converted(mut self, v: bool) -> Self {
        self.config.skip_already_converted = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn caption_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.caption_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        let name = c.root_output_name.trim();
        if name.is_empty() {
            return Err(BatchError::InvalidConfig(
                "Root output filename must not be empty".into(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(BatchError::InvalidConfig(format!(
                "Root output filename must be a bare filename, got '{}'",
                name
            )));
        }
        if c.max_tokens == 0 {
            return Err(BatchError::InvalidConfig(
                "Caption max tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What the pipeline does with images embedded in a PDF.
///
/// | Variant | Captioner called | Image in output |
/// |---------|------------------|-----------------|
/// | `Describe`  | yes | embedded, alt text carries the caption |
/// | `EmbedOnly` | no  | embedded, alt text `Image n (Page p)` |
/// | `Omit`      | no  | not written |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageHandling {
    /// Caption every image with the vision model. (default)
    #[default]
    Describe,
    /// Embed images without captions (`--no-images`).
    EmbedOnly,
    /// Drop images from the output (`--no-images --omit-images`).
    Omit,
}

/// How to mark page boundaries inside a rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->" (default)
    #[default]
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the given page (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let c = BatchConfig::default();
        assert_eq!(c.imports_dir, PathBuf::from("imports"));
        assert_eq!(c.exports_dir, PathBuf::from("exports"));
        assert_eq!(c.root_output_name, "combined_documents.md");
        assert_eq!(c.section_separator, "___");
        assert!(c.describes_images());
        assert!(!c.skip_already_converted);
    }

    #[test]
    fn builder_rejects_empty_root_output() {
        let err = BatchConfig::builder().root_output_name("  ").build().unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_root_output_with_path() {
        let err = BatchConfig::builder()
            .root_output_name("../escape.md")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bare filename"));
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = BatchConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn embed_only_does_not_describe() {
        let c = BatchConfig::builder()
            .image_handling(ImageHandling::EmbedOnly)
            .build()
            .unwrap();
        assert!(!c.describes_images());
    }

    #[test]
    fn page_separator_render() {
        assert_eq!(PageSeparator::Comment.render(3), "\n\n<!-- page 3 -->\n\n");
        assert_eq!(PageSeparator::HorizontalRule.render(2), "\n\n---\n\n");
        assert_eq!(
            PageSeparator::Custom("* * *".into()).render(2),
            "\n\n* * *\n\n"
        );
    }
}
