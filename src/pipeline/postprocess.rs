//! Post-processing: deterministic cleanup of extracted text and captions.
//!
//! pdfium returns page text exactly as laid out in the content stream: hard
//! line breaks mid-sentence, words split with a trailing hyphen, runs of
//! spaces used for horizontal positioning, and the occasional zero-width or
//! BOM character. Vision models add their own quirks to captions (quotes,
//! "This image shows" boilerplate, multi-line answers).
//!
//! Each rule here is a small pure `&str → String` function so it can be tested
//! on its own. The helpers for filenames, anchors and titles live here too
//! because they are the same kind of string normalisation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Clean one page of extracted text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Re-join words hyphenated across a line break
/// 4. Collapse runs of spaces and tabs inside a line
/// 5. Trim each line
/// 6. Collapse 3+ consecutive blank lines down to one blank line
/// 7. Trim the whole block
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = dehyphenate(&s);
    let s = collapse_inline_spaces(&s);
    let s = trim_lines(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| {
            !matches!(
                c,
                '\u{200B}' // zero-width space
                | '\u{200C}' // zero-width non-joiner
                | '\u{200D}' // zero-width joiner
                | '\u{FEFF}' // BOM
                | '\u{00AD}' // soft hyphen
                | '\u{2060}' // word joiner
                | '\u{0000}'
            )
        })
        .collect()
}

// ── Rule 3: De-hyphenate across line breaks ──────────────────────────────────

static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w)-\n[ \t]*(\w)").unwrap());

fn dehyphenate(input: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(input, "$1$2").to_string()
}

// ── Rule 4: Collapse inline spaces ───────────────────────────────────────────

static RE_INLINE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

fn collapse_inline_spaces(input: &str) -> String {
    RE_INLINE_SPACES.replace_all(input, " ").to_string()
}

// ── Rule 5: Trim each line ───────────────────────────────────────────────────

fn trim_lines(input: &str) -> String {
    input.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Captions ─────────────────────────────────────────────────────────────────

static RE_CAPTION_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:this|the)\s+(?:image|picture|figure|photo)\s+(?:shows|depicts|contains|is)\s+")
        .unwrap()
});

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise a model caption into a single line suitable for alt text.
///
/// Flattens whitespace, strips wrapping quotes and the "This image shows"
/// preamble, and capitalises the first letter. Returns an empty string for
/// blank input.
pub fn clean_caption(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = RE_WHITESPACE.replace_all(s.trim(), " ");
    let s = s.trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
    let s = RE_CAPTION_PREAMBLE.replace(s, "");
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escape characters that would end Markdown link or image text early.
///
/// Backslashes go first so a trailing `\` cannot swallow the closing `]`.
pub fn escape_alt_text(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

// ── Filenames, titles and anchors ────────────────────────────────────────────

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static RE_SEP_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").unwrap());

/// Turn a folder or file name into a safe output filename stem.
///
/// Any extension is dropped, characters other than word characters,
/// whitespace and `-` become `_`, runs of whitespace and underscores collapse
/// to one `_`, and leading/trailing `_` are trimmed. Falls back to
/// `untitled`.
pub fn sanitize_filename(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let s = RE_NON_WORD.replace_all(&stem, "_");
    let s = RE_SEP_RUNS.replace_all(&s, "_");
    let s = s.trim_matches('_');
    if s.is_empty() {
        "untitled".to_string()
    } else {
        s.to_string()
    }
}

/// Human-readable title from a PDF path: stem with `_`/`-` as spaces, each
/// word capitalised.
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = stem
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalise)
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// GitHub-style heading anchor: lowercase, punctuation dropped, spaces as `-`.
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c == ' ' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

/// Assigns unique anchors the way GitHub does for repeated headings:
/// `intro`, `intro-1`, `intro-2`.
///
/// A suffixed candidate that collides with an anchor already handed out
/// (say a heading literally titled "Intro 1") is skipped.
#[derive(Debug, Default)]
pub struct AnchorSet {
    next_suffix: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique(&mut self, title: &str) -> String {
        let base = slugify(title);
        let mut anchor = base.clone();
        if self.taken.contains(&anchor) {
            let suffix = self.next_suffix.entry(base.clone()).or_insert(1);
            loop {
                anchor = format!("{}-{}", base, suffix);
                *suffix += 1;
                if !self.taken.contains(&anchor) {
                    break;
                }
            }
        }
        self.taken.insert(anchor.clone());
        anchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_normalises_crlf() {
        assert_eq!(clean_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn clean_text_dehyphenates() {
        assert_eq!(clean_text("docu-\nment text"), "document text");
    }

    #[test]
    fn clean_text_keeps_real_hyphens() {
        assert_eq!(clean_text("well-known fact"), "well-known fact");
    }

    #[test]
    fn clean_text_collapses_spaces() {
        assert_eq!(clean_text("a    b\t\tc"), "a b c");
    }

    #[test]
    fn clean_text_trims_lines() {
        assert_eq!(clean_text("  first  \n   second"), "first\nsecond");
    }

    #[test]
    fn clean_text_collapses_blank_lines() {
        assert_eq!(clean_text("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn clean_text_strips_invisible() {
        assert_eq!(clean_text("\u{FEFF}hel\u{200B}lo"), "hello");
    }

    #[test]
    fn clean_text_empty() {
        assert_eq!(clean_text("   \n\n  "), "");
    }

    #[test]
    fn clean_caption_flattens() {
        assert_eq!(
            clean_caption("  \"A bar chart\n  of revenue.\"  "),
            "A bar chart of revenue."
        );
    }

    #[test]
    fn clean_caption_strips_preamble() {
        assert_eq!(
            clean_caption("This image shows a red square."),
            "A red square."
        );
    }

    #[test]
    fn clean_caption_blank() {
        assert_eq!(clean_caption("  \n "), "");
    }

    #[test]
    fn escape_alt_text_brackets() {
        assert_eq!(escape_alt_text("see [1]"), "see \\[1\\]");
    }

    #[test]
    fn escape_alt_text_trailing_backslash() {
        assert_eq!(escape_alt_text(r"C:\docs\"), r"C:\\docs\\");
        assert_eq!(escape_alt_text(r"a\]"), r"a\\\]");
    }

    #[test]
    fn sanitize_filename_rules() {
        assert_eq!(sanitize_filename("Q1 Reports"), "Q1_Reports");
        assert_eq!(sanitize_filename("a/b"), "b");
        assert_eq!(sanitize_filename("hello (draft) v2"), "hello_draft_v2");
        assert_eq!(sanitize_filename("__x__"), "x");
        assert_eq!(sanitize_filename("report.pdf"), "report");
        assert_eq!(sanitize_filename("???"), "untitled");
    }

    #[test]
    fn title_from_path_capitalises() {
        assert_eq!(
            title_from_path(Path::new("imports/a/annual_report-2024.pdf")),
            "Annual Report 2024"
        );
        assert_eq!(title_from_path(Path::new("README.pdf")), "Readme");
    }

    #[test]
    fn slugify_github_style() {
        assert_eq!(slugify("Annual Report 2024"), "annual-report-2024");
        assert_eq!(slugify("What's New?"), "whats-new");
    }

    #[test]
    fn anchor_set_deduplicates() {
        let mut anchors = AnchorSet::new();
        assert_eq!(anchors.unique("Intro"), "intro");
        assert_eq!(anchors.unique("Intro"), "intro-1");
        assert_eq!(anchors.unique("Intro"), "intro-2");
        assert_eq!(anchors.unique("Other"), "other");
    }

    #[test]
    fn anchor_set_skips_suffix_already_taken() {
        let mut anchors = AnchorSet::new();
        let a = anchors.unique("Intro");
        let b = anchors.unique("Intro");
        let c = anchors.unique("Intro 1");
        assert_eq!((a.as_str(), b.as_str()), ("intro", "intro-1"));
        assert_ne!(b, c);
        assert_eq!(c, "intro-1-1");
        // Literal "Intro 1" first, then repeats of "Intro" step past it.
        let mut anchors = AnchorSet::new();
        assert_eq!(anchors.unique("Intro 1"), "intro-1");
        assert_eq!(anchors.unique("Intro"), "intro");
        assert_eq!(anchors.unique("Intro"), "intro-2");
    }
}
