// ABOUTME: DOM manipulation and traversal utilities for article fragments.
// ABOUTME: Holds the fragment wrapper, text collection, purification rules and final cleaners.

//! DOM utilities for article fragments.
//!
//! Article bodies are parsed with `scraper` and edited in place through the
//! underlying `ego_tree`. Removed nodes are detached, so every later traversal
//! from the fragment root only sees live nodes.

pub mod cleaners;
pub mod fragment;
pub mod purify;
pub mod text;

use scraper::Selector;

use crate::error::ConfigError;

pub use fragment::{select_within, ArticleFragment};

/// Parses a CSS selector, reporting failures against the site that declared it.
pub(crate) fn compile_selector(site: &str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector {
        site: site.to_string(),
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Tags that start a new line of text when rendered.
pub(crate) const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

pub(crate) fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name))
}
