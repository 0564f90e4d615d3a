// ABOUTME: Declarative removal rules applied to an article fragment before block extraction.
// ABOUTME: Rules run in order and detach matches; the generic cleaners always run afterwards.

use ego_tree::NodeId;
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cleaners::final_cleanup;
use super::compile_selector;
use super::fragment::ArticleFragment;
use super::text::own_text;
use crate::error::ConfigError;

/// Which nodes a matching rule removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extent {
    /// The matched element and its subtree.
    #[default]
    Node,
    /// The matched element's parent. Falls back to the element itself when the
    /// parent is the fragment root.
    Parent,
    /// The matched element and every following sibling.
    NodeAndFollowing,
}

/// Restricts a rule to elements whose own text matches `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub pattern: String,
    /// Only the first N characters of the own text are examined.
    #[serde(default)]
    pub within_chars: Option<usize>,
}

/// A removal rule as written in site configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRule {
    pub selector: String,
    #[serde(default)]
    pub text: Option<TextMatch>,
    #[serde(default)]
    pub extent: Extent,
}

impl RemovalRule {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
            extent: Extent::Node,
        }
    }

    pub fn with_text(mut self, pattern: impl Into<String>, within_chars: Option<usize>) -> Self {
        self.text = Some(TextMatch {
            pattern: pattern.into(),
            within_chars,
        });
        self
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    /// Validates the selector and text pattern. `site` only labels errors.
    pub fn compile(&self, site: &str) -> Result<CompiledRule, ConfigError> {
        let selector = compile_selector(site, &self.selector)?;
        let text = match &self.text {
            Some(m) => Some(CompiledTextMatch {
                regex: Regex::new(&m.pattern).map_err(|source| ConfigError::InvalidPattern {
                    site: site.to_string(),
                    pattern: m.pattern.clone(),
                    source,
                })?,
                within_chars: m.within_chars,
            }),
            None => None,
        };
        Ok(CompiledRule {
            selector,
            text,
            extent: self.extent,
        })
    }
}

#[derive(Debug, Clone)]
struct CompiledTextMatch {
    regex: Regex,
    within_chars: Option<usize>,
}

impl CompiledTextMatch {
    fn matches(&self, text: &str) -> bool {
        match self.within_chars {
            Some(n) => {
                let head: String = text.chars().take(n).collect();
                self.regex.is_match(&head)
            }
            None => self.regex.is_match(text),
        }
    }
}

/// A validated removal rule.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    selector: Selector,
    text: Option<CompiledTextMatch>,
    extent: Extent,
}

impl CompiledRule {
    fn matches(&self, fragment: &ArticleFragment) -> Vec<NodeId> {
        let candidates = fragment.select(&self.selector);
        match &self.text {
            None => candidates,
            Some(text) => candidates
                .into_iter()
                .filter(|id| {
                    fragment
                        .node(*id)
                        .is_some_and(|node| text.matches(&own_text(node)))
                })
                .collect(),
        }
    }

    fn targets(&self, fragment: &ArticleFragment, matched: NodeId) -> Vec<NodeId> {
        let Some(node) = fragment.node(matched) else {
            return Vec::new();
        };
        match self.extent {
            Extent::Node => vec![matched],
            Extent::Parent => match node.parent() {
                Some(parent) if parent.id() != fragment.root_id() => vec![parent.id()],
                _ => vec![matched],
            },
            Extent::NodeAndFollowing => std::iter::once(matched)
                .chain(node.next_siblings().map(|s| s.id()))
                .collect(),
        }
    }
}

/// Applies site removal rules and then the generic cleanup to a fragment.
#[derive(Debug, Clone, Default)]
pub struct Purifier<'r> {
    rules: &'r [CompiledRule],
    keep: Vec<&'r Selector>,
}

impl<'r> Purifier<'r> {
    pub fn new(rules: &'r [CompiledRule]) -> Self {
        Self {
            rules,
            keep: Vec::new(),
        }
    }

    /// Elements matching any of `selectors` survive the empty-element cleanup,
    /// as do their ancestors.
    pub fn keep(mut self, selectors: impl IntoIterator<Item = &'r Selector>) -> Self {
        self.keep.extend(selectors);
        self
    }

    /// Purifies `fragment` in place and returns how many nodes the site rules removed.
    pub fn purify(&self, fragment: &mut ArticleFragment) -> usize {
        let mut removed = 0;
        for rule in self.rules {
            let targets: Vec<NodeId> = rule
                .matches(fragment)
                .into_iter()
                .flat_map(|id| rule.targets(fragment, id))
                .collect();
            for id in targets {
                if fragment.is_attached(id) {
                    fragment.detach(id);
                    removed += 1;
                }
            }
        }
        final_cleanup(fragment, &self.keep);
        debug!(removed, "purified article fragment");
        removed
    }
}
