//! Conversion between Markdown text and stored field HTML.
//!
//! Markdown fields are rendered to HTML and the original Markdown is embedded,
//! base64 encoded, in the `data-original-markdown` attribute of the outermost
//! element. Reading a field back never looks at the rendered HTML, only at that
//! attribute, so the round trip is exact. Re-rendering the embedded Markdown and
//! comparing with the stored HTML tells whether the field was edited elsewhere.

use crate::math;
use crate::types::ConverterConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use comrak::plugins::syntect::SyntectAdapter;
use comrak::{markdown_to_html_with_plugins, Options, Plugins};
use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{ns, parse_document, serialize, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::io;

/// Attribute holding the base64 encoded source Markdown.
pub const MARKDOWN_ATTRIBUTE: &str = "data-original-markdown";

/// Themes bundled with syntect's default theme set.
pub const SYNTAX_THEMES: &[&str] = &[
    "base16-ocean.dark",
    "base16-eighties.dark",
    "base16-mocha.dark",
    "base16-ocean.light",
    "InspiredGitHub",
    "Solarized (dark)",
    "Solarized (light)",
];

// A single trailing newline still counts as plain.
static PLAIN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[a-zA-Z0-9æøåÆØÅ ,.?+-]*\n?\z").unwrap());
static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<style>.*</style>").unwrap());
static EMPTY_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"<b>\s*</b>").unwrap());
static EMPTY_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"<i>\s*</i>").unwrap());
static EMPTY_DIV: Lazy<Regex> = Lazy::new(|| Regex::new(r"<div>\s*</div>").unwrap());

/// Converts field text in both directions with a fixed configuration.
pub struct FieldConverter {
    config: ConverterConfig,
    highlighter: Option<SyntectAdapter>,
}

impl fmt::Debug for FieldConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConverter")
            .field("config", &self.config)
            .field("highlighting", &self.highlighter.is_some())
            .finish()
    }
}

impl Default for FieldConverter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

impl FieldConverter {
    pub fn new(config: ConverterConfig) -> Self {
        let highlighter = match config.syntax_theme.as_deref() {
            Some(theme) if SYNTAX_THEMES.contains(&theme) => Some(SyntectAdapter::new(Some(theme))),
            Some(theme) => {
                tracing::warn!(theme, "unknown syntax theme, code blocks will not be highlighted");
                None
            }
            None => None,
        };

        Self {
            config,
            highlighter,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert editor text to field HTML.
    pub fn to_field(&self, text: &str, use_markdown: bool) -> String {
        if use_markdown {
            self.markdown_to_field(text)
        } else {
            plain_to_field(text)
        }
    }

    /// True if the field was generated from Markdown and has been edited since.
    pub fn is_inconsistent(&self, html: &str) -> bool {
        if !is_markdown_generated(html) {
            return false;
        }
        self.to_field(&to_markdown(html), true) != html
    }

    /// Switch a field between its Markdown source and Markdown-generated HTML.
    pub fn toggle(&self, field_or_text: &str) -> String {
        if is_markdown_generated(field_or_text) {
            return to_markdown(field_or_text);
        }
        self.to_field(&math::to_dollar_math(field_or_text), true)
    }

    fn markdown_to_field(&self, text: &str) -> String {
        // Really plain text is stored as is.
        if PLAIN_TEXT.is_match(text) {
            return text.to_string();
        }

        // Newlines become <br /> so the payload reads well in other editors.
        let payload = STANDARD.encode(text.replace('\n', "<br />"));

        let (protected, placeholders) = math::protect(text, self.config.math_mode);
        let rendered = self.render_markdown(&escape_for_renderer(&protected));
        let html = placeholders.restore(&rendered);

        attach_payload(&html, &payload)
    }

    fn render_markdown(&self, text: &str) -> String {
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.footnotes = true;
        options.extension.description_lists = true;
        options.render.unsafe_ = true;

        let mut plugins = Plugins::default();
        if let Some(adapter) = self.highlighter.as_ref() {
            plugins.render.codefence_syntax_highlighter = Some(adapter);
        }

        markdown_to_html_with_plugins(text, &options, &plugins)
    }
}

/// Recover the Markdown a field was generated from.
///
/// Fields without a payload are returned unchanged.
pub fn to_markdown(html: &str) -> String {
    let Some(encoded) = HtmlFragment::parse(html).root_attribute(MARKDOWN_ATTRIBUTE) else {
        return html.to_string();
    };

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()));

    match decoded {
        Ok(text) => text.replace("<br />", "\n"),
        Err(error) => {
            tracing::debug!(%error, "field payload could not be decoded");
            html.to_string()
        }
    }
}

/// True if the outermost element of `html` carries a Markdown payload.
pub fn is_markdown_generated(html: &str) -> bool {
    HtmlFragment::parse(html)
        .root_attribute(MARKDOWN_ATTRIBUTE)
        .is_some()
}

/// Text of a stored field, as shown in an editor buffer.
pub fn field_to_text(html: &str) -> String {
    // Fields taken from rendered cards may carry the model's stylesheet.
    let field = STYLE_BLOCK.replace_all(html, "");

    if is_markdown_generated(&field) {
        return to_markdown(&field);
    }

    clean_html(&field)
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .trim()
        .to_string()
}

fn plain_to_field(text: &str) -> String {
    clean_html(&text.replace('\n', "<br />"))
}

fn clean_html(text: &str) -> String {
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&nbsp;", " ");
    let text = EMPTY_BOLD.replace_all(&text, "");
    let text = EMPTY_ITALIC.replace_all(&text, "");
    let text = EMPTY_DIV.replace_all(&text, "");
    text.trim().to_string()
}

/// Escape sequences the renderer would otherwise eat, and normalize spaces.
fn escape_for_renderer(text: &str) -> String {
    text.replace(r"\\", r"\\\\")
        .replace(r"\{", r"\\{")
        .replace(r"\}", r"\\}")
        .replace("*}", r"\*}")
        .replace(r"\[", r"\\[")
        .replace(r"\]", r"\\]")
        .replace(r"\(", r"\\(")
        .replace(r"\)", r"\\)")
        .replace("\u{c2}\u{a0}", " ")
        .replace('\u{a0}', " ")
}

fn attach_payload(html: &str, payload: &str) -> String {
    let mut fragment = HtmlFragment::parse(html);

    if fragment.root_element().is_none() {
        // An empty field would collapse in editors, keep a space in it.
        let inner = if html.is_empty() { "&nbsp;" } else { html };
        fragment = HtmlFragment::parse(&format!("<div>{inner}</div>"));
    }

    match fragment.root_element() {
        Some(root) => {
            set_attribute(&root, MARKDOWN_ATTRIBUTE, payload);
            match fragment.serialize() {
                Ok(serialized) => serialized,
                Err(error) => {
                    tracing::debug!(%error, "field could not be serialized, keeping the render");
                    html.to_string()
                }
            }
        }
        None => html.to_string(),
    }
}

/// A field's HTML parsed into a DOM.
struct HtmlFragment {
    dom: RcDom,
}

impl HtmlFragment {
    fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        Self { dom }
    }

    fn section(&self, name: &str) -> Option<Handle> {
        let html = child_element(&self.dom.document, "html")?;
        child_element(&html, name)
    }

    /// First element among the top-level nodes of the field.
    fn root_element(&self) -> Option<Handle> {
        let body = self.section("body")?;
        let children = body.children.borrow();
        children
            .iter()
            .find(|node| matches!(node.data, NodeData::Element { .. }))
            .cloned()
    }

    fn root_attribute(&self, name: &str) -> Option<String> {
        self.root_element()
            .and_then(|root| get_attribute(&root, name))
    }

    fn serialize(&self) -> io::Result<String> {
        let mut output = Vec::new();
        self.write_to(&mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    fn write_to<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::IncludeNode,
            ..Default::default()
        };

        // Elements like <style> end up in <head> when they lead the field.
        for section in ["head", "body"] {
            let Some(parent) = self.section(section) else {
                continue;
            };
            for child in parent.children.borrow().iter() {
                let serializable = SerializableHandle::from(child.clone());
                serialize(&mut writer, &serializable, opts.clone())?;
            }
        }
        Ok(())
    }
}

fn child_element(parent: &Handle, name: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|node| match &node.data {
            NodeData::Element { name: qual, .. } => &*qual.local == name,
            _ => false,
        })
        .cloned()
}

fn get_attribute(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn set_attribute(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        attrs.retain(|attr| &*attr.name.local != name);
        attrs.push(Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MathMode;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn converter() -> FieldConverter {
        FieldConverter::new(ConverterConfig {
            math_mode: MathMode::Mathjax,
            syntax_theme: None,
        })
    }

    fn converter_with_mode(math_mode: MathMode) -> FieldConverter {
        FieldConverter::new(ConverterConfig {
            math_mode,
            syntax_theme: None,
        })
    }

    /// Insert text right after the first tag, leaving the payload alone.
    fn edit_visible_text(html: &str) -> String {
        let end_of_tag = html.find('>').unwrap() + 1;
        format!("{}edited {}", &html[..end_of_tag], &html[end_of_tag..])
    }

    #[test]
    fn plain_text_is_stored_as_is() {
        let fc = converter();
        for text in ["", "Hello world", "What is 2+2?", "Blåbær, æøå - ok."] {
            assert_eq!(fc.to_field(text, true), text);
            assert!(!is_markdown_generated(text));
        }
    }

    #[test]
    fn markdown_field_embeds_payload() {
        let html = converter().to_field("**bold**", true);
        assert_eq!(
            html,
            "<p data-original-markdown=\"Kipib2xkKio=\"><strong>bold</strong></p>\n"
        );
        assert!(is_markdown_generated(&html));
        assert_eq!(to_markdown(&html), "**bold**");
    }

    #[test]
    fn multiline_markdown_round_trips() {
        let fc = converter();
        let text = "# Heading\n\n- one\n- two\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nDone.";
        let html = fc.to_field(text, true);
        assert!(html.contains("<table"));
        assert!(html.contains("<li>one</li>"));
        assert_eq!(to_markdown(&html), text);
    }

    #[test]
    fn empty_render_becomes_nbsp_div() {
        let html = converter().to_field("\n\n", true);
        assert_eq!(
            html,
            "<div data-original-markdown=\"PGJyIC8+PGJyIC8+\">&nbsp;</div>"
        );
        assert_eq!(to_markdown(&html), "\n\n");
    }

    #[test]
    fn plain_text_allows_one_trailing_newline() {
        let fc = converter();
        for text in ["Hello\n", "\n", "What is 2+2?\n"] {
            assert_eq!(fc.to_field(text, true), text);
        }
        assert!(is_markdown_generated(&fc.to_field("Hello\n\n", true)));
        assert!(is_markdown_generated(&fc.to_field("Hello\nworld", true)));
    }

    struct FailingWriter;

    impl io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn serialize_errors_are_returned() {
        let fragment = HtmlFragment::parse("<p>text</p>");
        assert!(fragment.write_to(FailingWriter).is_err());
        assert_eq!(fragment.serialize().unwrap(), "<p>text</p>");
    }

    #[test]
    fn reconversion_is_idempotent() {
        let fc = converter();
        let text = "Some *emphasis* and `code`\n\n1. first\n2. second";
        let html = fc.to_field(text, true);
        assert_eq!(fc.to_field(&to_markdown(&html), true), html);
        assert!(!fc.is_inconsistent(&html));
    }

    #[test]
    fn edited_html_is_inconsistent() {
        let fc = converter();
        let html = fc.to_field("Use *this* here", true);
        assert!(!fc.is_inconsistent(&html));

        let edited = edit_visible_text(&html);
        assert!(is_markdown_generated(&edited));
        assert_eq!(to_markdown(&edited), "Use *this* here");
        assert!(fc.is_inconsistent(&edited));
    }

    #[test]
    fn foreign_html_is_never_inconsistent() {
        let fc = converter();
        assert!(!fc.is_inconsistent("<div>Hand written <b>HTML</b></div>"));
        assert!(!fc.is_inconsistent("plain"));
    }

    #[test]
    fn foreign_html_is_returned_unchanged() {
        let html = "<div>Made <i>elsewhere</i></div>";
        assert!(!is_markdown_generated(html));
        assert_eq!(to_markdown(html), html);
    }

    #[test]
    fn payload_only_counts_on_first_element() {
        let html = "<p>first</p><p data-original-markdown=\"eA==\">second</p>";
        assert!(!is_markdown_generated(html));
    }

    #[test]
    fn broken_payload_degrades_to_html() {
        let html = "<p data-original-markdown=\"***\">x</p>";
        assert!(is_markdown_generated(html));
        assert_eq!(to_markdown(html), html);
    }

    #[test]
    fn inline_math_is_protected_in_mathjax_mode() {
        let html = converter().to_field("Use $x^2$ here", true);
        assert!(html.contains(r"\(x^2\)"), "{html}");
        assert!(!html.contains("<sup>"));
    }

    #[test]
    fn math_underscores_are_not_emphasis() {
        let html = converter().to_field("$$a_1 + b_1$$ and $c_2 * d_2$", true);
        assert!(html.contains(r"\[a_1 + b_1\]"), "{html}");
        assert!(html.contains(r"\(c_2 * d_2\)"), "{html}");
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn latex_mode_uses_bracket_tags() {
        let fc = converter_with_mode(MathMode::Latex);
        let html = fc.to_field("This is $$block$$ math.", true);
        assert!(html.contains("[$$]block[/$$]"), "{html}");
        let html = fc.to_field("This is $inline$ math.", true);
        assert!(html.contains("[$]inline[/$]"), "{html}");
    }

    #[test]
    fn literal_mathjax_delimiters_survive() {
        let html = converter().to_field(r"Area \(\pi r^2\)", true);
        assert!(html.contains(r"\(\pi r^2\)"), "{html}");
    }

    #[test]
    fn non_markdown_fields_use_br() {
        let fc = converter();
        assert_eq!(fc.to_field("line 1\nline 2", false), "line 1<br />line 2");
        assert_eq!(fc.to_field("a &lt;b&gt; &amp;&nbsp;c", false), "a <b> & c");
        assert_eq!(fc.to_field("<b> </b>x<i></i><div> </div>", false), "x");
        assert!(!is_markdown_generated(&fc.to_field("<b>x</b>", false)));
    }

    #[test]
    fn field_text_for_editor() {
        assert_eq!(field_to_text("a<br>b<br/>c<br />d"), "a\nb\nc\nd");
        assert_eq!(field_to_text("<style>.card {}</style>x &amp; y"), "x & y");

        let html = converter().to_field("*md*\nsecond line", true);
        assert_eq!(field_to_text(&html), "*md*\nsecond line");
    }

    #[test]
    fn toggle_switches_representation() {
        let fc = converter();
        let html = fc.toggle("Some *markdown*");
        assert!(is_markdown_generated(&html));
        assert_eq!(fc.toggle(&html), "Some *markdown*");
    }

    #[test]
    fn toggle_turns_mathjax_into_dollars() {
        let fc = converter();
        let html = fc.toggle(r"Area: \(\pi r^2\)");
        assert_eq!(to_markdown(&html), "Area: $\\pi r^2$");
        assert!(html.contains(r"\(\pi r^2\)"), "{html}");
    }

    #[test]
    fn code_blocks_without_theme_keep_language_class() {
        let html = converter().to_field("```rust\nfn main() {}\n```", true);
        assert!(html.contains("language-rust"), "{html}");
        assert!(html.starts_with("<pre data-original-markdown="), "{html}");
    }

    #[test]
    fn code_blocks_with_theme_use_inline_styles() {
        let fc = FieldConverter::new(ConverterConfig::default());
        let html = fc.to_field("```rust\nfn main() {}\n```", true);
        assert!(html.contains("style=\""), "{html}");
        assert_eq!(to_markdown(&html), "```rust\nfn main() {}\n```");
    }

    #[test]
    fn unknown_theme_disables_highlighting() {
        let fc = FieldConverter::new(ConverterConfig {
            syntax_theme: Some("no-such-theme".to_string()),
            ..Default::default()
        });
        let html = fc.to_field("```rust\nfn main() {}\n```", true);
        assert!(!html.contains("style=\""), "{html}");
    }

    #[test]
    fn non_breaking_spaces_are_normalized() {
        let html = converter().to_field("a\u{a0}*b*", true);
        assert!(html.contains("a <em>b</em>"), "{html}");
        assert_eq!(to_markdown(&html), "a\u{a0}*b*");
    }

    proptest! {
        #[test]
        fn markdown_round_trip(text in "[a-zA-Z0-9 *_#`$>|\\-\\n\\\\{}()\\[\\]]{1,60}") {
            prop_assume!(!PLAIN_TEXT.is_match(&text));
            let fc = converter();
            let html = fc.to_field(&text, true);
            prop_assert!(is_markdown_generated(&html));
            prop_assert_eq!(to_markdown(&html), text.clone());
            prop_assert_eq!(fc.to_field(&to_markdown(&html), true), html.clone());
            prop_assert!(!fc.is_inconsistent(&html));
        }
    }
}
