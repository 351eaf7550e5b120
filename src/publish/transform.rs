//! Content shaping for publish targets.

use pulldown_cmark::{html, Options, Parser};
use regex::{Captures, Regex};
use scraper::Html;
use std::sync::LazyLock;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>")
        .expect("valid script pattern")
});

static PARAGRAPH_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(p|div|h[1-6]|blockquote|section|article|ul|ol|table)\s*>")
        .expect("valid block pattern")
});

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(li|tr)\s*>").expect("valid break pattern")
});

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</[a-z][a-z0-9]*\s*>|<(br|hr|img)\b[^>]*>|&(#[0-9]+|#x[0-9a-f]+|[a-z][a-z0-9]*);")
        .expect("valid markup pattern")
});

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid space pattern"));

static STYLED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(p|h1|h2|h3|blockquote|ul|ol|li|pre|code|img|a)([\s>/])")
        .expect("valid tag pattern")
});

fn inline_style(tag: &str) -> &'static str {
    match tag {
        "p" => "margin:0 0 1em;line-height:1.75;font-size:15px;color:#333;",
        "h1" => "margin:1.2em 0 0.6em;font-size:22px;font-weight:bold;",
        "h2" => "margin:1.2em 0 0.6em;font-size:19px;font-weight:bold;",
        "h3" => "margin:1em 0 0.5em;font-size:17px;font-weight:bold;",
        "blockquote" => "margin:1em 0;padding:0.5em 1em;border-left:4px solid #ddd;color:#666;",
        "ul" | "ol" => "margin:0 0 1em;padding-left:1.5em;",
        "li" => "margin:0.25em 0;line-height:1.75;",
        "pre" => "margin:1em 0;padding:1em;background:#f6f8fa;overflow-x:auto;",
        "code" => "font-family:Menlo,Consolas,monospace;font-size:13px;",
        "img" => "max-width:100%;display:block;margin:1em auto;",
        "a" => "color:#576b95;text-decoration:none;",
        _ => "",
    }
}

/// Flatten HTML into readable plain text.
///
/// Scripts and styles are dropped, block ends become newlines, entities are
/// decoded and runs of whitespace collapse. Input with no closing tag, void
/// element or entity is already plain text and is only normalized, so a
/// literal `<b>` in clean text survives. Escaped markup such as
/// `&lt;/p&gt;` still decodes into tags that a second pass would strip.
pub fn html_to_plain_text(html: &str) -> String {
    if !MARKUP.is_match(html) {
        return normalize_lines(html);
    }

    let without_scripts = SCRIPT_OR_STYLE.replace_all(html, "");
    let with_breaks = PARAGRAPH_END.replace_all(&without_scripts, "\n\n");
    let with_breaks = LINE_BREAK.replace_all(&with_breaks, "\n");

    let fragment = Html::parse_fragment(&with_breaks);
    let text: String = fragment.root_element().text().collect();

    normalize_lines(&text)
}

/// Trim every line, collapse inline whitespace and keep at most one blank line.
fn normalize_lines(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = INLINE_SPACE.replace_all(line.trim(), " ").into_owned();
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Convert HTML to markdown, falling back to plain text if conversion fails.
pub fn html_to_markdown(html: &str) -> String {
    htmd::convert(html)
        .map(|md| md.trim().to_string())
        .unwrap_or_else(|_| html_to_plain_text(html))
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Normalize HTML through markdown and re-render it with inline styles.
///
/// Existing attributes other than the ones markdown keeps (links, image
/// sources) are discarded, so rendering the output again yields the same HTML.
pub fn render_styled_html(html: &str) -> String {
    let cleaned = SCRIPT_OR_STYLE.replace_all(html, "");
    let markdown = html_to_markdown(&cleaned);
    let rendered = markdown_to_html(&markdown);

    STYLED_TAG
        .replace_all(&rendered, |caps: &Captures| {
            format!("<{} style=\"{}\"{}", &caps[1], inline_style(&caps[1]), &caps[2])
        })
        .into_owned()
}
