// ABOUTME: Text helpers for feed fields: whitespace collapsing and HTML-to-plain-text.
// ABOUTME: Feed titles and summaries often carry entities or inline markup.

use scraper::Html;

/// Collapses runs of whitespace (including non-breaking spaces) into single spaces and trims.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses `s` as an HTML fragment and returns its text with entities decoded
/// and whitespace collapsed.
pub fn plain_text(s: &str) -> String {
    if !s.contains('<') && !s.contains('&') {
        return normalize_whitespace(s);
    }
    let fragment = Html::parse_fragment(s);
    let text: String = fragment.root_element().text().collect();
    normalize_whitespace(&text)
}

/// Removes a `<![CDATA[ ... ]]>` wrapper if present.
pub fn strip_cdata(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(trimmed)
}
