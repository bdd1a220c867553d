use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PadStats {
    pub characters: usize,
    pub words: usize,
}

impl PadStats {
    pub fn from_html(html: &str) -> Self {
        let text = visible_text(html);
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
        }
    }
}

fn visible_text(html: &str) -> String {
    static RE_BLOCK: OnceLock<Regex> = OnceLock::new();
    static RE_TAG: OnceLock<Regex> = OnceLock::new();

    let re_block = RE_BLOCK.get_or_init(|| {
        Regex::new(r"(?i)</?(?:p|h[1-6]|li|ul|ol|br|div|blockquote|pre)\b[^>]*>").unwrap()
    });
    let re_tag = RE_TAG.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());

    let spaced = re_block.replace_all(html, " ");
    let stripped = re_tag.replace_all(&spaced, "");
    // &amp; last so "&amp;lt;" stays literal
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
