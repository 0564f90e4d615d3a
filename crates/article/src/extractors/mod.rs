// ABOUTME: Content extraction: site configuration and the node-to-block walk.
// ABOUTME: Includes the ownership map, root boundary, media resolution and registry loading.

//! Content extraction module.
//!
//! Submodules:
//! - `site`: per-site configuration and its compiled form.
//! - `loader`: bundled and user-supplied site registries.
//! - `blocks`: the walk that maps a purified fragment to content blocks.
//! - `boundary` and `ownership`: the bookkeeping that walk relies on.
//! - `media`: image source resolution.

pub mod blocks;
pub mod boundary;
pub mod loader;
pub mod media;
pub mod ownership;
pub mod site;

pub use blocks::{BlockRules, ContentBlockExtractor, Extraction, QuoteMarker};
pub use boundary::RootBoundary;
pub use loader::{load_builtin_registry, load_registry_from_path, load_registry_from_str};
pub use ownership::{NodeIndex, NodeKey, Ownership, OwnershipMap};
pub use site::{
    ArticleRules, AttrSelector, CompiledSite, ListingSettings, QuoteMarkerRule, SiteConfig,
    SiteRegistry,
};
