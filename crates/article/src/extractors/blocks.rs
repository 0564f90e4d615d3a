// ABOUTME: Content block extraction: one pre-order walk that maps article nodes to blocks.
// ABOUTME: Classifies images, quotes and paragraph text, collapsing nested matches via the ownership map.

//! Content block extraction.
//!
//! The walk visits every live node of a purified fragment once, in pre-order.
//! A node whose own registration or an ancestor's registration is sealed
//! (a quote or an image already consumed it) is skipped. Everything else is
//! classified in this order:
//!
//! 1. content images become [`ContentBlock::Image`],
//! 2. quote markers emit the quote found next to them,
//! 3. quote-typed elements, and nodes whose nearest quote-typed ancestor lies
//!    inside the same top-level unit, emit a [`ContentBlock::Quote`],
//! 4. remaining text accumulates into the paragraph of its nearest
//!    [`RootBoundary`] member. Loose text and inline elements sitting
//!    directly under the root form runs; a run ends at a block, at an element
//!    holding an image or a quote, or after a double `<br>`, and each run
//!    is one paragraph.
//!
//! Upward searches are explicit loops that stop at the article root or at a
//! boundary member, so they are bounded by the depth of one top-level unit.

use ego_tree::{NodeId, NodeRef};
use newsroom_feed::normalize_whitespace;
use scraper::{ElementRef, Node, Selector};
use tracing::debug;

use super::boundary::RootBoundary;
use super::media::image_source;
use super::ownership::{Entry, NodeIndex, NodeKey, Ownership, OwnershipMap};
use crate::dom::text::collect_text;
use crate::dom::{is_block_tag, ArticleFragment};
use crate::error::OwnershipViolation;
use crate::result::ContentBlock;

/// A quote drawn as a decorative marker element next to the element holding its text.
#[derive(Debug, Clone)]
pub struct QuoteMarker {
    pub marker: Selector,
    /// Looked up among the descendants of the marker's parent.
    pub body: Selector,
}

/// Compiled classification rules for one site.
#[derive(Debug, Clone)]
pub struct BlockRules {
    pub image: Selector,
    pub quote: Selector,
    pub quote_marker: Option<QuoteMarker>,
}

impl Default for BlockRules {
    fn default() -> Self {
        Self {
            image: Selector::parse("img").expect("valid default image selector"),
            quote: Selector::parse("blockquote").expect("valid default quote selector"),
            quote_marker: None,
        }
    }
}

/// Blocks in document order plus the final node-to-block ownership.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub blocks: Vec<ContentBlock>,
    /// Maps node keys to indexes into `blocks`.
    pub ownership: OwnershipMap,
}

/// Walks a purified fragment and emits its content blocks.
#[derive(Debug, Clone, Copy)]
pub struct ContentBlockExtractor<'r> {
    rules: &'r BlockRules,
}

impl<'r> ContentBlockExtractor<'r> {
    pub fn new(rules: &'r BlockRules) -> Self {
        Self { rules }
    }

    pub fn extract(
        &self,
        fragment: &ArticleFragment,
        boundary: &RootBoundary,
    ) -> Result<Extraction, OwnershipViolation> {
        let index = NodeIndex::build(fragment);
        let mut walk = Walk {
            fragment,
            boundary,
            rules: self.rules,
            index: &index,
            slots: Vec::new(),
            ownership: OwnershipMap::new(),
        };
        for id in index.nodes().iter().skip(1) {
            walk.visit(*id)?;
        }
        let extraction = walk.finish();
        debug!(
            nodes = index.len(),
            blocks = extraction.blocks.len(),
            "extracted content blocks"
        );
        Ok(extraction)
    }
}

#[derive(Debug)]
struct Piece {
    node: NodeId,
    /// Nearest block-level ancestor within the paragraph owner.
    context: NodeId,
    text: String,
    separated: bool,
}

#[derive(Debug)]
enum Slot {
    Paragraph {
        pieces: Vec<Piece>,
        pending_break: bool,
    },
    Quote(String),
    Image(String),
}

struct Walk<'a> {
    fragment: &'a ArticleFragment,
    boundary: &'a RootBoundary,
    rules: &'a BlockRules,
    index: &'a NodeIndex,
    slots: Vec<Slot>,
    ownership: OwnershipMap,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, id: NodeId) -> Result<(), OwnershipViolation> {
        if self.is_consumed(id) {
            return Ok(());
        }
        let Some(node) = self.fragment.node(id) else {
            return Ok(());
        };
        match node.value() {
            Node::Text(text) => match self.quote_ancestor(node) {
                Some(quote) => self.take_quote(quote),
                None => self.append_text(node, text),
            },
            Node::Element(_) => match ElementRef::wrap(node) {
                Some(element) => self.visit_element(element),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn visit_element(&mut self, element: ElementRef<'a>) -> Result<(), OwnershipViolation> {
        let rules = self.rules;
        if rules.image.matches(&element) {
            return self.take_image(element);
        }
        if let Some(marker) = &rules.quote_marker {
            if marker.marker.matches(&element) {
                if let Some(body) = marker_body(element, &marker.body) {
                    return self.take_marker(element, body);
                }
            }
        }
        if rules.quote.matches(&element) {
            return self.take_quote(*element);
        }
        if let Some(quote) = self.quote_ancestor(*element) {
            return self.take_quote(quote);
        }
        if is_br(*element) {
            self.mark_break(*element);
        }
        Ok(())
    }

    fn key(&self, node: NodeRef<'_, Node>) -> Option<NodeKey> {
        self.index.key(node.id())
    }

    /// True when `id` or an ancestor below the root is sealed.
    fn is_consumed(&self, id: NodeId) -> bool {
        let mut current = self.fragment.node(id);
        while let Some(node) = current {
            if node.id() == self.boundary.root() {
                return false;
            }
            if self.key(node).is_some_and(|k| self.ownership.is_sealed(k)) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Nearest quote-typed ancestor of `node`, searched upward until the root
    /// or the first boundary member that is not quote-typed.
    fn quote_ancestor(&self, node: NodeRef<'a, Node>) -> Option<NodeRef<'a, Node>> {
        let mut current = node.parent();
        while let Some(parent) = current {
            if parent.id() == self.boundary.root() {
                return None;
            }
            if ElementRef::wrap(parent).is_some_and(|e| self.rules.quote.matches(&e)) {
                return Some(parent);
            }
            if self.boundary.contains(parent.id()) {
                return None;
            }
            current = parent.parent();
        }
        None
    }

    /// Nearest boundary member above `node`, or the start of its root-level run.
    fn paragraph_owner(&self, node: NodeRef<'a, Node>) -> NodeRef<'a, Node> {
        let mut current = node;
        while let Some(parent) = current.parent() {
            if parent.id() == self.boundary.root() {
                return self.run_start(current);
            }
            if self.boundary.contains(parent.id()) {
                return parent;
            }
            current = parent;
        }
        current
    }

    /// First node of the root-level run that `node` belongs to.
    fn run_start(&self, node: NodeRef<'a, Node>) -> NodeRef<'a, Node> {
        if self.boundary.contains(node.id()) || self.holds_media(node) {
            return node;
        }
        let mut start = node;
        while let Some(prev) = start.prev_sibling() {
            if self.boundary.contains(prev.id()) || self.holds_media(prev) || is_double_break(prev)
            {
                break;
            }
            start = prev;
        }
        start
    }

    /// True when `node` is or contains an image, a quote or a quote marker.
    fn holds_media(&self, node: NodeRef<'a, Node>) -> bool {
        let Some(element) = ElementRef::wrap(node) else {
            return false;
        };
        let rules = self.rules;
        element.descendants().filter_map(ElementRef::wrap).any(|el| {
            rules.image.matches(&el)
                || rules.quote.matches(&el)
                || rules
                    .quote_marker
                    .as_ref()
                    .is_some_and(|m| m.marker.matches(&el) || m.body.matches(&el))
        })
    }

    fn block_context(&self, node: NodeRef<'a, Node>, owner: NodeRef<'a, Node>) -> NodeId {
        let mut current = node.parent();
        while let Some(ancestor) = current {
            if ancestor.id() == owner.id() || ancestor.id() == self.boundary.root() {
                break;
            }
            if ancestor
                .value()
                .as_element()
                .is_some_and(|el| is_block_tag(el.name()))
            {
                return ancestor.id();
            }
            current = ancestor.parent();
        }
        owner.id()
    }

    fn take_image(&mut self, element: ElementRef<'a>) -> Result<(), OwnershipViolation> {
        let Some(url) = image_source(element, self.fragment.url()) else {
            return Ok(());
        };
        let Some(key) = self.key(*element) else {
            return Ok(());
        };
        let slot = self.slots.len();
        self.ownership.register(key, slot, Ownership::Sealed)?;
        self.slots.push(Slot::Image(url));
        self.release_ancestors(*element);
        Ok(())
    }

    fn take_quote(&mut self, node: NodeRef<'a, Node>) -> Result<(), OwnershipViolation> {
        let text = collect_text(node);
        if text.is_empty() {
            return Ok(());
        }
        let Some(key) = self.key(node) else {
            return Ok(());
        };
        let slot = self.slots.len();
        self.ownership.register(key, slot, Ownership::Sealed)?;
        self.slots.push(Slot::Quote(text));
        self.retract_within(node.id());
        self.release_ancestors(node);
        Ok(())
    }

    fn take_marker(
        &mut self,
        marker: ElementRef<'a>,
        body: ElementRef<'a>,
    ) -> Result<(), OwnershipViolation> {
        let text = collect_text(*body);
        if text.is_empty() {
            return Ok(());
        }
        let (Some(marker_key), Some(body_key)) = (self.key(*marker), self.key(*body)) else {
            return Ok(());
        };

        match self.ownership.get(body_key) {
            Some(Entry {
                ownership: Ownership::Sealed,
                slot,
            }) => {
                return Err(OwnershipViolation {
                    key: body_key,
                    existing: slot,
                })
            }
            Some(_) => {
                self.ownership.release(body_key);
            }
            None => {}
        }
        if self.is_consumed(body.id()) {
            return Ok(());
        }

        self.retract_within(body.id());
        let slot = self.slots.len();
        self.ownership.register(body_key, slot, Ownership::Sealed)?;
        if marker_key != body_key {
            self.ownership.register(marker_key, slot, Ownership::Sealed)?;
        }
        self.slots.push(Slot::Quote(text));
        self.release_ancestors(*body);
        Ok(())
    }

    fn append_text(&mut self, node: NodeRef<'a, Node>, text: &str) -> Result<(), OwnershipViolation> {
        let owner = self.paragraph_owner(node);
        let Some(owner_key) = self.key(owner) else {
            return Ok(());
        };
        let slot = match self.ownership.get(owner_key) {
            Some(Entry {
                ownership: Ownership::Open,
                slot,
            }) => slot,
            Some(_) => return Ok(()),
            None => {
                if text.trim().is_empty() {
                    return Ok(());
                }
                let slot = self.slots.len();
                self.ownership.register(owner_key, slot, Ownership::Open)?;
                self.slots.push(Slot::Paragraph {
                    pieces: Vec::new(),
                    pending_break: false,
                });
                slot
            }
        };

        let context = self.block_context(node, owner);
        if let Some(Slot::Paragraph {
            pieces,
            pending_break,
        }) = self.slots.get_mut(slot)
        {
            let separated = std::mem::take(pending_break)
                || pieces.last().is_some_and(|p| p.context != context);
            pieces.push(Piece {
                node: node.id(),
                context,
                text: text.to_string(),
                separated,
            });
        }
        Ok(())
    }

    fn mark_break(&mut self, br: NodeRef<'a, Node>) {
        let owner = self.paragraph_owner(br);
        if owner.id() == br.id() {
            return;
        }
        let Some(Entry {
            ownership: Ownership::Open,
            slot,
        }) = self.key(owner).and_then(|k| self.ownership.get(k))
        else {
            return;
        };
        if let Some(Slot::Paragraph { pending_break, .. }) = self.slots.get_mut(slot) {
            *pending_break = true;
        }
    }

    /// Releases open registrations on the ancestors of `node`, below the root,
    /// so text after it starts a new paragraph.
    fn release_ancestors(&mut self, node: NodeRef<'a, Node>) {
        for ancestor in node.ancestors() {
            if ancestor.id() == self.boundary.root() {
                break;
            }
            if let Some(key) = self.key(ancestor) {
                self.ownership.release(key);
            }
        }
    }

    /// Takes back paragraph text contributed by nodes inside `container`.
    fn retract_within(&mut self, container: NodeId) {
        let fragment = self.fragment;
        for slot in &mut self.slots {
            if let Slot::Paragraph { pieces, .. } = slot {
                pieces.retain(|piece| !is_inside(fragment, piece.node, container));
            }
        }
    }

    fn finish(self) -> Extraction {
        let mut blocks = Vec::new();
        let mut remap = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            let block = match slot {
                Slot::Paragraph { pieces, .. } => {
                    let mut raw = String::new();
                    for piece in pieces {
                        if piece.separated {
                            raw.push(' ');
                        }
                        raw.push_str(&piece.text);
                    }
                    let text = normalize_whitespace(&raw);
                    (!text.is_empty()).then_some(ContentBlock::Paragraph(text))
                }
                Slot::Quote(text) => Some(ContentBlock::Quote(text)),
                Slot::Image(url) => Some(ContentBlock::Image(url)),
            };
            match block {
                Some(block) => {
                    remap.push(Some(blocks.len()));
                    blocks.push(block);
                }
                None => remap.push(None),
            }
        }
        let mut ownership = self.ownership;
        ownership.remap(&remap);
        Extraction { blocks, ownership }
    }
}

/// First element under the marker's parent that matches the body selector.
fn marker_body<'a>(marker: ElementRef<'a>, body: &Selector) -> Option<ElementRef<'a>> {
    let parent = marker.parent()?;
    parent
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| body.matches(el))
}

/// A `<br>` whose previous sibling, ignoring blank text, is another `<br>`.
fn is_double_break(node: NodeRef<'_, Node>) -> bool {
    if !is_br(node) {
        return false;
    }
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        match sibling.value() {
            Node::Text(text) if text.trim().is_empty() => prev = sibling.prev_sibling(),
            Node::Comment(_) => prev = sibling.prev_sibling(),
            _ => return is_br(sibling),
        }
    }
    false
}

fn is_br(node: NodeRef<'_, Node>) -> bool {
    node.value()
        .as_element()
        .is_some_and(|el| el.name().eq_ignore_ascii_case("br"))
}

fn is_inside(fragment: &ArticleFragment, node: NodeId, container: NodeId) -> bool {
    fragment
        .node(node)
        .is_some_and(|n| n.ancestors().any(|a| a.id() == container))
}
