// ABOUTME: Main library entry point for the newsroom article engine.
// ABOUTME: Re-exports the public API: Client, sites and registries, parse_article, PostRecord and errors.

//! Newsroom - turns news site feeds and article pages into structured posts.
//!
//! Each site is described by a [`SiteConfig`]. The engine reads the site's
//! feed listing, fetches every listed article, purifies its body with the
//! site's removal rules and splits what is left into paragraph, quote and
//! image blocks.
//!
//! # Example
//!
//! ```no_run
//! use newsroom_article::{load_builtin_registry, Client, CrawlError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CrawlError> {
//!     let registry = load_builtin_registry();
//!     let client = Client::builder().concurrency(8).build();
//!     let site = registry.require("lgototvet")?;
//!     let report = client.crawl(site).await?;
//!     println!("{} posts, {} failures", report.posts.len(), report.failures.len());
//!     Ok(())
//! }
//! ```

pub mod article;
pub mod assemble;
pub mod client;
pub mod dom;
pub mod error;
pub mod extractors;
pub mod options;
pub mod resource;
pub mod result;

pub use crate::article::parse_article;
pub use crate::assemble::assemble;
pub use crate::client::{crawl_site, fetch_listing, Client, PageFetcher};
pub use crate::error::{ArticleError, ConfigError, CrawlError, ErrorCode, OwnershipViolation};
pub use crate::extractors::{
    load_builtin_registry, load_registry_from_path, load_registry_from_str, ArticleRules,
    AttrSelector, CompiledSite, ListingSettings, QuoteMarkerRule, SiteConfig, SiteRegistry,
};
pub use crate::options::{ClientBuilder, Options};
pub use crate::result::{ArticleFailure, ContentBlock, CrawlReport, PostRecord, Result};
