// ABOUTME: Node indexing and the node-to-block ownership map used during extraction.
// ABOUTME: Keys are pre-order ordinals; a live key is owned by at most one block slot.

use std::collections::HashMap;
use std::fmt;

use ego_tree::NodeId;
use serde::Serialize;

use crate::dom::ArticleFragment;
use crate::error::OwnershipViolation;

/// Pre-order ordinal of a node within one purified fragment. The root is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeKey(pub usize);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Assigns every live node of a fragment its [`NodeKey`] in one pre-order pass.
#[derive(Debug, Clone)]
pub struct NodeIndex {
    order: Vec<NodeId>,
    keys: HashMap<NodeId, NodeKey>,
}

impl NodeIndex {
    pub fn build(fragment: &ArticleFragment) -> Self {
        let order: Vec<NodeId> = fragment.root().descendants().map(|n| n.id()).collect();
        let keys = order
            .iter()
            .enumerate()
            .map(|(ordinal, id)| (*id, NodeKey(ordinal)))
            .collect();
        Self { order, keys }
    }

    pub fn key(&self, id: NodeId) -> Option<NodeKey> {
        self.keys.get(&id).copied()
    }

    /// Node ids in pre-order, root first.
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Whether an owning block still accepts text from its subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    /// Paragraph owner; accumulates text until released.
    Open,
    /// Quote or image; its whole subtree is consumed.
    Sealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub slot: usize,
    pub ownership: Ownership,
}

/// Map from node key to the block slot that node produced.
#[derive(Debug, Clone, Default)]
pub struct OwnershipMap {
    entries: HashMap<NodeKey, Entry>,
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` to `slot`. Fails if `key` is already registered.
    pub fn register(
        &mut self,
        key: NodeKey,
        slot: usize,
        ownership: Ownership,
    ) -> Result<(), OwnershipViolation> {
        if let Some(existing) = self.entries.get(&key) {
            return Err(OwnershipViolation {
                key,
                existing: existing.slot,
            });
        }
        self.entries.insert(key, Entry { slot, ownership });
        Ok(())
    }

    pub fn get(&self, key: NodeKey) -> Option<Entry> {
        self.entries.get(&key).copied()
    }

    pub fn is_sealed(&self, key: NodeKey) -> bool {
        self.get(key)
            .is_some_and(|e| e.ownership == Ownership::Sealed)
    }

    /// Drops an open registration so later text under `key` starts a new paragraph.
    /// Sealed registrations are never released.
    pub fn release(&mut self, key: NodeKey) -> Option<Entry> {
        match self.entries.get(&key) {
            Some(entry) if entry.ownership == Ownership::Open => self.entries.remove(&key),
            _ => None,
        }
    }

    /// Rewrites slot numbers through `remap`, dropping entries whose slot produced no block.
    pub(crate) fn remap(&mut self, remap: &[Option<usize>]) {
        self.entries.retain(|_, entry| match remap.get(entry.slot).copied().flatten() {
            Some(block) => {
                entry.slot = block;
                true
            }
            None => false,
        });
    }

    /// The block a node ended up in, after extraction.
    pub fn block_of(&self, key: NodeKey) -> Option<usize> {
        self.get(key).map(|e| e.slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, Entry)> + '_ {
        self.entries.iter().map(|(k, e)| (*k, *e))
    }
}
