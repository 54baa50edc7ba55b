//! Prompts for vision-model image captions.
//!
//! Kept in one place so tests can inspect them and so the captioning code in
//! [`crate::pipeline::caption`] stays about retries and errors only. Callers
//! can override the default via [`crate::config::BatchConfig::caption_prompt`].

/// Default system prompt for describing one image extracted from a PDF.
///
/// This prompt is used when `BatchConfig::caption_prompt` is `None`.
pub const DEFAULT_CAPTION_PROMPT: &str = r#"You describe images extracted from PDF documents so that a reader of the Markdown version, who cannot see the image, understands what it contained.

Follow these rules precisely:

1. CONTENT
   - Say what the image shows: chart type and what it measures, diagram and what it connects, photo subject, table topic, logo owner
   - Include any legible title, axis labels, or key numbers
   - Do not guess at text you cannot read

2. LENGTH
   - One or two sentences, at most 60 words
   - No lists, no headings, no line breaks

3. OUTPUT FORMAT
   - Output ONLY the description
   - Do NOT start with "This image shows" or similar
   - Do NOT wrap the answer in quotes or code fences"#;

/// User-turn text sent alongside the image.
///
/// The page number gives the model a hint that the image belongs to a larger
/// document without leaking the document text into the request.
pub fn caption_request(page: usize, index: usize) -> String {
    format!(
        "Describe image {} from page {} of the document.",
        index + 1,
        page
    )
}
