// ABOUTME: ArticleFragment wraps a parsed page and the node its article body starts at.
// ABOUTME: Provides scoped selection and in-place node removal over the ego_tree.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// A parsed document plus the element the article body is rooted at.
///
/// Removing a node detaches it from the tree; detached nodes are unreachable
/// from the root and therefore invisible to later selections and walks.
#[derive(Debug, Clone)]
pub struct ArticleFragment {
    html: Html,
    root: NodeId,
    url: Option<Url>,
}

impl ArticleFragment {
    /// Wraps `html` with `root` as the article root. Returns `None` when
    /// `root` is not an element of `html`.
    pub fn new(html: Html, root: NodeId) -> Option<Self> {
        let is_element = html.tree.get(root).is_some_and(|n| n.value().is_element());
        is_element.then_some(Self {
            html,
            root,
            url: None,
        })
    }

    /// Parses a standalone HTML snippet; the root is the synthetic `<html>` wrapper.
    pub fn parse(body: &str) -> Self {
        let html = Html::parse_fragment(body);
        let root = html.root_element().id();
        Self {
            html,
            root,
            url: None,
        }
    }

    /// Moves the article root to `root`, which must be an attached element
    /// under the current root. Returns `None` otherwise.
    pub fn narrow(self, root: NodeId) -> Option<Self> {
        if root != self.root && !self.is_attached(root) {
            return None;
        }
        let url = self.url;
        Self::new(self.html, root).map(|fragment| Self { url, ..fragment })
    }

    /// Sets the page URL used to resolve relative media sources.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html
            .tree
            .get(self.root)
            .and_then(ElementRef::wrap)
            .expect("fragment root is checked to be an element on construction")
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.node(id).and_then(ElementRef::wrap)
    }

    /// Element descendants of the root matching `selector`, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        select_within(self.root(), selector)
    }

    /// Detaches `id` and its subtree. The root itself is never detached.
    pub fn detach(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    /// True while `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id == self.root {
            return true;
        }
        self.node(id)
            .is_some_and(|n| n.ancestors().any(|a| a.id() == self.root))
    }

    #[cfg(test)]
    pub(crate) fn tree_mut(&mut self) -> &mut ego_tree::Tree<Node> {
        &mut self.html.tree
    }

    pub fn inner_html(&self) -> String {
        self.root().inner_html()
    }
}

/// Element descendants of `root` (excluding `root`) matching `selector`, in document order.
pub fn select_within(root: ElementRef<'_>, selector: &Selector) -> Vec<NodeId> {
    root.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| selector.matches(el))
        .map(|el| el.id())
        .collect()
}
