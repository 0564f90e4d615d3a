// ABOUTME: Text collection over DOM subtrees with block-aware spacing.
// ABOUTME: Used for quote bodies, descriptions and removal-rule text matching.

use ego_tree::NodeRef;
use newsroom_feed::normalize_whitespace;
use scraper::Node;

use super::is_block_tag;

/// Collects the text of `node` and its descendants, separating block-level
/// elements and `<br>` with spaces, then collapses whitespace.
pub fn collect_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    normalize_whitespace(&out)
}

fn push_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(el) => {
            let name = el.name();
            if name.eq_ignore_ascii_case("br") {
                out.push(' ');
                return;
            }
            let block = is_block_tag(name);
            if block {
                out.push(' ');
            }
            for child in node.children() {
                push_text(child, out);
            }
            if block {
                out.push(' ');
            }
        }
        _ => {}
    }
}

/// The concatenated direct text children of `node`, unnormalized.
pub fn own_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    for child in node.children() {
        if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
    out
}
