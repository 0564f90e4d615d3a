// ABOUTME: Generic DOM cleaners run after the site removal rules.
// ABOUTME: Strips non-content tags and comments, prunes empty elements and collapses whitespace runs.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Node, Selector};

use super::fragment::ArticleFragment;
use super::is_block_tag;

// Tags whose content never belongs in article text
const STRIP_TAGS: &[&str] = &["script", "style", "noscript", "template"];

// Elements that carry content without text
const MEDIA_TAGS: &[&str] = &[
    "audio", "canvas", "embed", "iframe", "img", "object", "picture", "source", "svg", "video",
];

// Empty by nature but structurally meaningful
const VOID_KEEP_TAGS: &[&str] = &["br", "hr"];

fn tag_in(name: &str, list: &[&str]) -> bool {
    list.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Runs the three generic cleanup passes in order.
pub fn final_cleanup(fragment: &mut ArticleFragment, keep: &[&Selector]) {
    strip_non_content(fragment);
    remove_empty(fragment, keep);
    collapse_whitespace(fragment);
}

/// Detaches script-like elements and comment nodes.
pub fn strip_non_content(fragment: &mut ArticleFragment) {
    let doomed: Vec<NodeId> = fragment
        .root()
        .descendants()
        .skip(1)
        .filter(|node| match node.value() {
            Node::Comment(_) | Node::ProcessingInstruction(_) => true,
            Node::Element(el) => tag_in(el.name(), STRIP_TAGS),
            _ => false,
        })
        .map(|node| node.id())
        .collect();
    for id in doomed {
        fragment.detach(id);
    }
}

/// Detaches elements with no text and no media, unless protected by `keep`.
pub fn remove_empty(fragment: &mut ArticleFragment, keep: &[&Selector]) {
    let mut doomed = Vec::new();
    let root = *fragment.root();
    for child in root.children() {
        mark_empty(child, keep, &mut doomed);
    }
    for id in doomed {
        fragment.detach(id);
    }
}

// Returns whether `node` holds content; pushes contentless elements onto `doomed`.
fn mark_empty(node: NodeRef<'_, Node>, keep: &[&Selector], doomed: &mut Vec<NodeId>) -> bool {
    match node.value() {
        Node::Text(text) => !text.trim().is_empty(),
        Node::Element(el) => {
            if tag_in(el.name(), VOID_KEEP_TAGS) {
                return false;
            }
            let mut content = tag_in(el.name(), MEDIA_TAGS)
                || ElementRef::wrap(node).is_some_and(|e| keep.iter().any(|s| s.matches(&e)));
            for child in node.children() {
                // Every child is visited so nested empties are collected too.
                content |= mark_empty(child, keep, doomed);
            }
            if !content {
                doomed.push(node.id());
            }
            content
        }
        _ => false,
    }
}

/// Drops whitespace-only text nodes except a single one between two inline siblings.
/// A run of blank nodes reduces to its first node.
pub fn collapse_whitespace(fragment: &mut ArticleFragment) {
    let mut doomed = Vec::new();
    for node in fragment.root().descendants() {
        if is_blank_text(node) && !is_significant_space(node) {
            doomed.push(node.id());
        }
    }
    for id in doomed {
        fragment.detach(id);
    }
}

fn is_blank_text(node: NodeRef<'_, Node>) -> bool {
    node.value().as_text().is_some_and(|t| t.trim().is_empty())
}

fn is_inline_content(node: NodeRef<'_, Node>) -> bool {
    match node.value() {
        Node::Text(text) => !text.trim().is_empty(),
        Node::Element(el) => !is_block_tag(el.name()) && !tag_in(el.name(), VOID_KEEP_TAGS),
        _ => false,
    }
}

// Only the first blank node of a run can survive, and only between inline content.
fn is_significant_space(node: NodeRef<'_, Node>) -> bool {
    if !node.prev_sibling().is_some_and(is_inline_content) {
        return false;
    }
    node.next_siblings()
        .find(|sibling| !is_blank_text(*sibling))
        .is_some_and(is_inline_content)
}
