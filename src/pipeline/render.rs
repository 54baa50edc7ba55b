//! Document rendering: [`ExtractedDocument`] → one self-contained Markdown section.
//!
//! Images are inlined as base64 `data:` URIs so a folder's output file can be
//! moved or shared without any sidecar assets. Rendering is a pure function of
//! the document, the configuration and the timestamp passed in.

use crate::config::{BatchConfig, ImageHandling, PageSeparator};
use crate::output::{file_name_of, ExtractedDocument, ExtractedImage};
use crate::pipeline::encode::data_uri;
use crate::pipeline::postprocess::{clean_caption, clean_text, escape_alt_text, title_from_path};
use chrono::{DateTime, Local};

/// Timestamp format used in section metadata.
pub const PROCESSED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A rendered document, ready to be placed in a folder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownSection {
    pub title: String,
    /// Set by the orchestrator once the section's position in the folder is
    /// known; empty straight out of [`DocumentRenderer::render`].
    pub anchor: String,
    pub markdown: String,
}

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    page_separator: PageSeparator,
    image_handling: ImageHandling,
}

impl DocumentRenderer {
    pub fn new(page_separator: PageSeparator, image_handling: ImageHandling) -> Self {
        Self {
            page_separator,
            image_handling,
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.page_separator.clone(), config.image_handling)
    }

    pub fn render(&self, doc: &ExtractedDocument, processed_at: DateTime<Local>) -> MarkdownSection {
        let title = title_from_path(&doc.source);

        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", title));
        md.push_str(&self.metadata_block(doc, processed_at));

        let mut body = String::new();
        let mut image_number = 0usize;
        let multi_page = doc.pages.len() > 1;

        for (i, page) in doc.pages.iter().enumerate() {
            if multi_page && i > 0 {
                body.push_str(&self.page_separator.render(page.number));
            }

            let mut blocks: Vec<String> = Vec::new();
            let text = clean_text(&page.text);
            if !text.is_empty() {
                blocks.push(text);
            }

            if self.image_handling != ImageHandling::Omit {
                let mut images: Vec<&ExtractedImage> = page.images.iter().collect();
                images.sort_by_key(|img| img.index);
                for image in images {
                    image_number += 1;
                    blocks.push(image_markdown(image, image_number));
                }
            }

            body.push_str(&blocks.join("\n\n"));
        }

        let body = body.trim();
        if !body.is_empty() {
            md.push_str("\n\n");
            md.push_str(body);
        }
        md.push('\n');

        MarkdownSection {
            title,
            anchor: String::new(),
            markdown: md,
        }
    }

    fn metadata_block(&self, doc: &ExtractedDocument, processed_at: DateTime<Local>) -> String {
        let mut lines = vec![
            format!("*Source: {}*", file_name_of(&doc.source)),
            format!("*Processed: {}*", processed_at.format(PROCESSED_AT_FORMAT)),
            format!("*Pages: {}*", doc.page_count),
        ];
        if let Some(author) = doc.info.author.as_deref() {
            lines.push(format!("*Author: {}*", author));
        }
        // Two trailing spaces force a Markdown line break.
        lines.join("  \n")
    }
}

fn image_markdown(image: &ExtractedImage, number: usize) -> String {
    let label = format!("Image {} (Page {})", number, image.page);
    let alt = match image.caption_text().map(clean_caption) {
        Some(caption) if !caption.is_empty() => {
            format!("{}: {}", label, escape_alt_text(&caption))
        }
        _ => label,
    };
    format!("![{}]({})", alt, data_uri(image))
}
