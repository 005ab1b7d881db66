//! Keeps `$...$` and `$$...$$` spans away from the Markdown renderer.
//!
//! [`protect`] swaps every math span for a placeholder token before rendering and
//! remembers the form the span should take in the output. [`MathPlaceholders::restore`]
//! puts the spans back into the rendered HTML.

use crate::types::MathMode;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const PLACEHOLDER_PREFIX: &str = "MATH-PLACEHOLDER-";

static MATH_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$(.*?)\$\$|\$(.*?)\$").unwrap());
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"MATH-PLACEHOLDER-(\d+)").unwrap());

static MATHJAX_DISPLAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\[(.*?)\\\]").unwrap());
static MATHJAX_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\((.*?)\\\)").unwrap());
static LATEX_DISPLAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\$\$\](.*?)\[/\$\$\]").unwrap());
static LATEX_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[\$\](.*?)\[/\$\]").unwrap());

/// Rendered math spans, indexed by placeholder number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MathPlaceholders {
    spans: Vec<String>,
}

impl MathPlaceholders {
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Replace every placeholder token in `html` with its math span, verbatim.
    pub fn restore(&self, html: &str) -> String {
        if self.spans.is_empty() {
            return html.to_string();
        }

        PLACEHOLDER
            .replace_all(html, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.spans.get(idx))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Replace math spans in `text` with placeholder tokens.
///
/// Display math (`$$`) is matched before inline math (`$`); both match
/// non-greedily and across lines.
pub fn protect(text: &str, mode: MathMode) -> (String, MathPlaceholders) {
    let mut placeholders = MathPlaceholders::default();

    let protected = MATH_SPAN
        .replace_all(text, |caps: &Captures| {
            let span = match (caps.get(1), caps.get(2)) {
                (Some(display), _) => format_display(display.as_str(), mode),
                (None, Some(inline)) => format_inline(inline.as_str(), mode),
                (None, None) => caps[0].to_string(),
            };
            let token = format!("{PLACEHOLDER_PREFIX}{}", placeholders.spans.len());
            placeholders.spans.push(span);
            token
        })
        .into_owned();

    (protected, placeholders)
}

fn format_display(math: &str, mode: MathMode) -> String {
    match mode {
        MathMode::Latex => format!("[$$]{math}[/$$]"),
        MathMode::Off | MathMode::Mathjax => format!(r"\[{math}\]"),
    }
}

fn format_inline(math: &str, mode: MathMode) -> String {
    match mode {
        MathMode::Latex => format!("[$]{math}[/$]"),
        MathMode::Off | MathMode::Mathjax => format!(r"\({math}\)"),
    }
}

/// Turn MathJax and LaTeX-mode delimiters back into `$$...$$` and `$...$`.
pub fn to_dollar_math(text: &str) -> String {
    let text = LATEX_DISPLAY.replace_all(text, "$$$$${1}$$$$");
    let text = LATEX_INLINE.replace_all(&text, "$$${1}$$");
    let text = MATHJAX_DISPLAY.replace_all(&text, "$$$$${1}$$$$");
    MATHJAX_INLINE.replace_all(&text, "$$${1}$$").into_owned()
}
