// ABOUTME: Root boundary set: the article root plus its top-level block containers.
// ABOUTME: Upward searches during extraction stop at the first member of this set.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Node, Selector};

use crate::dom::{is_block_tag, ArticleFragment};

// Containers that only group other blocks and are looked through
const WRAPPER_TAGS: &[&str] = &["article", "div", "figure", "main", "ol", "section", "ul"];

/// The article root and the nodes treated as its top-level content units.
#[derive(Debug, Clone)]
pub struct RootBoundary {
    root: NodeId,
    members: HashSet<NodeId>,
}

impl RootBoundary {
    /// Computes the boundary of a purified fragment. `quote` marks quote-typed
    /// elements, which are never looked through.
    pub fn compute(fragment: &ArticleFragment, quote: &Selector) -> Self {
        let root = fragment.root();
        let mut members = HashSet::new();
        members.insert(root.id());
        for child in root.children() {
            collect_members(child, quote, &mut members);
        }
        Self {
            root: root.id(),
            members,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// Inline elements are left out: they join the run of loose text around them.
fn collect_members(node: NodeRef<'_, Node>, quote: &Selector, members: &mut HashSet<NodeId>) {
    let Some(element) = ElementRef::wrap(node) else {
        return;
    };
    if !is_block_tag(element.value().name()) && !quote.matches(&element) {
        return;
    }
    members.insert(node.id());
    if is_wrapper(element, quote) {
        for child in node.children() {
            collect_members(child, quote, members);
        }
    }
}

fn is_wrapper(element: ElementRef<'_>, quote: &Selector) -> bool {
    let name = element.value().name();
    if !WRAPPER_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name)) || quote.matches(&element) {
        return false;
    }
    let mut has_element = false;
    for child in element.children() {
        match child.value() {
            Node::Text(text) if !text.trim().is_empty() => return false,
            Node::Element(el) if !is_block_tag(el.name()) => return false,
            Node::Element(_) => has_element = true,
            _ => {}
        }
    }
    has_element
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary(html: &str) -> (ArticleFragment, RootBoundary) {
        let fragment = ArticleFragment::parse(html);
        let quote = Selector::parse("blockquote").unwrap();
        let boundary = RootBoundary::compute(&fragment, &quote);
        (fragment, boundary)
    }

    fn ids(fragment: &ArticleFragment, css: &str) -> Vec<NodeId> {
        fragment.select(&Selector::parse(css).unwrap())
    }

    #[test]
    fn root_children_are_members() {
        let (fragment, boundary) = boundary("<p>a</p><h2>b</h2><p>c <b>d</b></p>");
        assert!(boundary.contains(fragment.root_id()));
        assert!(ids(&fragment, "p, h2").iter().all(|id| boundary.contains(*id)));
        assert!(!boundary.contains(ids(&fragment, "b")[0]));
        assert_eq!(boundary.len(), 4);
    }

    #[test]
    fn wrappers_are_looked_through() {
        let (fragment, boundary) =
            boundary("<div class=w><p>a</p><ul><li>x</li><li>y</li></ul></div>");
        for id in ids(&fragment, ".w, p, ul, li") {
            assert!(boundary.contains(id));
        }
    }

    #[test]
    fn inline_root_children_are_not_members() {
        let (fragment, boundary) =
            boundary("Жители <b>Хабаровска</b> получили <a href=\"/x\">выплаты</a><br><p>a</p>");
        assert!(ids(&fragment, "b, a, br").iter().all(|id| !boundary.contains(*id)));
        assert!(boundary.contains(ids(&fragment, "p")[0]));
        assert_eq!(boundary.len(), 2);
    }

    #[test]
    fn containers_with_text_or_quotes_are_not_wrappers() {
        let (fragment, boundary) =
            boundary("<div>intro<p>a</p></div><blockquote><p>q</p></blockquote>");
        assert!(ids(&fragment, "div, blockquote").iter().all(|id| boundary.contains(*id)));
        assert!(ids(&fragment, "p").iter().all(|id| !boundary.contains(*id)));
    }
}
