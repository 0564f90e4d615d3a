// ABOUTME: Image source resolution and tracking-pixel filtering for content images.
// ABOUTME: Reads src with lazy-load fallbacks and resolves against the page URL.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

/// Attributes holding the image source, in order of preference.
const SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

/// URL fragments that indicate tracking pixels or placeholders (checked lowercase).
const INVALID_PATTERNS: &[&str] = &[
    "pixel",
    "tracking",
    "analytics",
    "beacon",
    "spacer",
    "clear.gif",
    "blank.gif",
    "1x1",
];

static TINY_DIMENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[?&](?:w|h|width|height)=[01](?:&|$)").expect("valid dimension regex")
});

/// Resolves `src` against `base`. Only http(s) results are returned.
pub fn resolve_image_url(src: &str, base: Option<&Url>) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    let resolved = match Url::parse(src) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(src).ok()?,
        Err(_) => return None,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Returns false for URLs matching known tracking or placeholder patterns.
pub fn is_valid_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    !INVALID_PATTERNS.iter().any(|p| lower.contains(p)) && !TINY_DIMENSION_RE.is_match(&lower)
}

fn is_tiny(element: ElementRef<'_>) -> bool {
    ["width", "height"].iter().any(|attr| {
        element
            .value()
            .attr(attr)
            .is_some_and(|v| matches!(v.trim(), "0" | "1" | "0px" | "1px"))
    })
}

/// The resolved source of a content image, or `None` when it has no usable
/// source or looks like a tracking pixel.
pub fn image_source(element: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    if is_tiny(element) {
        return None;
    }
    SOURCE_ATTRS
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .find_map(|src| resolve_image_url(src, base))
        .filter(|url| is_valid_image_url(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn source_of(html: &str) -> Option<String> {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("img").unwrap();
        let img = doc.select(&sel).next().unwrap();
        let base = Url::parse("https://example.com/news/1").unwrap();
        image_source(img, Some(&base))
    }

    #[test]
    fn relative_src_resolves_against_page() {
        assert_eq!(
            source_of(r#"<img src="/img/a.jpg">"#).as_deref(),
            Some("https://example.com/img/a.jpg")
        );
    }

    #[test]
    fn lazy_attributes_are_fallbacks() {
        assert_eq!(
            source_of(r#"<img data-src="b.png">"#).as_deref(),
            Some("https://example.com/news/b.png")
        );
        assert_eq!(
            source_of(r#"<img src="" data-lazy-src="https://cdn.example.com/c.webp">"#).as_deref(),
            Some("https://cdn.example.com/c.webp")
        );
    }

    #[test]
    fn tracking_pixels_are_rejected() {
        assert_eq!(source_of(r#"<img src="/counter/pixel.gif">"#), None);
        assert_eq!(source_of(r#"<img src="/a.gif" width="1" height="1">"#), None);
        assert_eq!(source_of(r#"<img src="/a.gif?w=1&h=1">"#), None);
        assert_eq!(source_of(r#"<img src="data:image/gif;base64,R0lGOD">"#), None);
    }

    #[test]
    fn normal_dimensions_pass() {
        assert!(is_valid_image_url("https://example.com/a.jpg?width=100"));
    }

    #[test]
    fn resolve_without_base_needs_absolute() {
        assert_eq!(resolve_image_url("/a.jpg", None), None);
        assert_eq!(
            resolve_image_url("https://example.com/a.jpg", None).as_deref(),
            Some("https://example.com/a.jpg")
        );
    }
}
