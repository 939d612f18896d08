use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::FetchError;

/// Turns a raw HTML page into plain text or markdown.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<String, FetchError>;
}

fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex")
}

static STRIPPED_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "noscript", "nav", "footer", "header"]
        .iter()
        .map(|tag| static_regex(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
        .collect()
});

static MAIN_REGIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["main", "article", "body"]
        .iter()
        .map(|tag| static_regex(&format!(r"(?is)<{tag}\b[^>]*>(.*)</{tag}\s*>")))
        .collect()
});

static HTML_COMMENT: Lazy<Regex> = Lazy::new(|| static_regex(r"(?s)<!--.*?-->"));
static HEADING: Lazy<Regex> =
    Lazy::new(|| static_regex(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>"));
static PRE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    static_regex(r"(?is)<pre\b[^>]*>(?:\s*<code\b[^>]*>)?(.*?)(?:</code>\s*)?</pre\s*>")
});
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| static_regex(r"(?is)<code\b[^>]*>(.*?)</code\s*>"));
static LINK: Lazy<Regex> = Lazy::new(|| {
    static_regex(r#"(?is)<a\b[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
});
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| static_regex(r"(?i)<li\b[^>]*>"));
static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    static_regex(r"(?i)<br\s*/?>|</(?:p|div|li|ul|ol|tr|table|section)\s*>")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| static_regex(r"(?s)<[^>]+>"));

static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| static_regex(r"\n\s*\n\s*\n"));
static EMPTY_LINK: Lazy<Regex> = Lazy::new(|| static_regex(r"\[\]\([^)]*\)"));
static EMPTY_FENCE: Lazy<Regex> = Lazy::new(|| static_regex(r"```\s*\n\s*```"));

/// Regex-based extractor: drops page chrome, keeps the `<main>`, `<article>`
/// or `<body>` region and rewrites common tags as markdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagStripExtractor;

impl ContentExtractor for TagStripExtractor {
    fn extract(&self, html: &str) -> Result<String, FetchError> {
        let mut page = HTML_COMMENT.replace_all(html, "").into_owned();
        for block in STRIPPED_BLOCKS.iter() {
            page = block.replace_all(&page, "").into_owned();
        }

        let region = MAIN_REGIONS
            .iter()
            .find_map(|re| {
                re.captures(&page)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .unwrap_or(page);

        let text = HEADING.replace_all(&region, |c: &Captures| {
            let level: usize = c[1].parse().unwrap_or(1);
            format!("\n\n{} {}\n\n", "#".repeat(level), strip_tags(&c[2]).trim())
        });
        let text = PRE_BLOCK.replace_all(&text, |c: &Captures| {
            format!("\n\n```\n{}\n```\n\n", strip_tags(&c[1]).trim_end())
        });
        let text =
            INLINE_CODE.replace_all(&text, |c: &Captures| format!("`{}`", strip_tags(&c[1])));
        let text = LINK.replace_all(&text, |c: &Captures| {
            format!("[{}]({})", strip_tags(&c[2]).trim(), &c[1])
        });
        let text = LIST_ITEM.replace_all(&text, "\n- ");
        let text = BLOCK_BREAK.replace_all(&text, "\n");
        let text = decode_entities(&strip_tags(&text));

        let cleaned = clean_markdown(&text);
        if cleaned.is_empty() {
            return Err(FetchError::Extraction("page has no readable content".into()));
        }
        Ok(cleaned)
    }
}

/// Normalize extracted markdown: collapse runs of blank lines, drop empty
/// links, empty code fences and HTML comments, trim.
pub fn clean_markdown(content: &str) -> String {
    let content = EXCESS_BLANK_LINES.replace_all(content, "\n\n");
    let content = EMPTY_LINK.replace_all(&content, "");
    let content = EMPTY_FENCE.replace_all(&content, "");
    let content = HTML_COMMENT.replace_all(&content, "");
    content.trim().to_string()
}

fn strip_tags(fragment: &str) -> String {
    ANY_TAG.replace_all(fragment, "").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
