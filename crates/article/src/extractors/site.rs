// ABOUTME: Per-site configuration: feed location, listing settings and article extraction rules.
// ABOUTME: SiteConfig is plain serde data; compile() validates it once into a CompiledSite.

//! Site configuration.
//!
//! Every supported news site is described by a [`SiteConfig`]: where its feed
//! lives, how the feed is read, and which selectors locate the article body,
//! lead image and description. Sites are collected in a [`SiteRegistry`] and
//! compiled before use so that selector and pattern errors surface once,
//! up front, instead of on every article.

use std::collections::BTreeMap;

use newsroom_feed::{DateFormat, ItemPolicy, ListingConfig, ListingLimits, ListingMode};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dom::compile_selector;
use crate::dom::purify::{CompiledRule, RemovalRule};
use crate::error::ConfigError;
use crate::extractors::blocks::{BlockRules, QuoteMarker};

fn default_image_selector() -> String {
    "img".to_string()
}

fn default_quote_selector() -> String {
    "blockquote".to_string()
}

/// A CSS selector plus the attribute to read from the first match, e.g.
/// `{"selector": "meta[property='og:image']", "attr": "content"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrSelector {
    pub selector: String,
    pub attr: String,
}

/// A decorative quote marker and the selector of the element carrying the quote text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteMarkerRule {
    pub marker: String,
    pub body: String,
}

/// How the site's feed is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingSettings {
    #[serde(default)]
    pub mode: ListingMode,
    #[serde(default)]
    pub date_format: DateFormat,
    #[serde(default)]
    pub include_preview: bool,
    #[serde(default)]
    pub on_invalid_item: ItemPolicy,
    /// Overrides the crawl-wide minimum record count.
    #[serde(default)]
    pub min: Option<usize>,
    /// Overrides the crawl-wide maximum record count.
    #[serde(default)]
    pub max: Option<usize>,
}

/// Selectors and rules applied to each article page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRules {
    /// Article body; a page without it is an empty article.
    pub body: String,
    /// Narrower content container inside the body, if the site has one.
    #[serde(default)]
    pub content: Option<String>,
    /// Lead image, looked up in the whole page.
    #[serde(default)]
    pub lead_image: Option<AttrSelector>,
    /// Description, looked up inside the body and removed from it.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remove: Vec<RemovalRule>,
    #[serde(default = "default_image_selector")]
    pub image: String,
    #[serde(default = "default_quote_selector")]
    pub quote: String,
    #[serde(default)]
    pub quote_marker: Option<QuoteMarkerRule>,
}

impl ArticleRules {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content: None,
            lead_image: None,
            description: None,
            remove: Vec::new(),
            image: default_image_selector(),
            quote: default_quote_selector(),
            quote_marker: None,
        }
    }
}

/// Everything the engine needs to know about one news site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    /// Feed location, relative to `base_url` or absolute.
    pub feed_path: String,
    #[serde(default)]
    pub listing: ListingSettings,
    pub article: ArticleRules,
}

impl SiteConfig {
    /// Absolute feed URL.
    pub fn feed_url(&self) -> Result<Url, ConfigError> {
        let base = self.parsed_base_url()?;
        base.join(&self.feed_path)
            .map_err(|source| ConfigError::InvalidUrl {
                site: self.name.clone(),
                url: self.feed_path.clone(),
                source,
            })
    }

    pub fn listing_config(&self) -> ListingConfig {
        ListingConfig {
            base_url: self.base_url.clone(),
            mode: self.listing.mode,
            date_format: self.listing.date_format.clone(),
            include_preview: self.listing.include_preview,
            on_invalid_item: self.listing.on_invalid_item,
        }
    }

    /// Crawl-wide `defaults` with this site's overrides applied.
    pub fn listing_limits(&self, defaults: ListingLimits) -> ListingLimits {
        ListingLimits {
            min: self.listing.min.unwrap_or(defaults.min),
            max: self.listing.max.unwrap_or(defaults.max),
        }
    }

    /// True when `url` belongs to this site. A leading `www.` is ignored on both sides.
    pub fn matches_url(&self, url: &Url) -> bool {
        let Ok(base) = Url::parse(&self.base_url) else {
            return false;
        };
        match (base.host_str(), url.host_str()) {
            (Some(a), Some(b)) => strip_www(a).eq_ignore_ascii_case(strip_www(b)),
            _ => false,
        }
    }

    /// Validates every selector, pattern and URL of this site.
    pub fn compile(&self) -> Result<CompiledSite, ConfigError> {
        let site = self.name.as_str();
        let base_url = self.parsed_base_url()?;
        let feed_url = self.feed_url()?;
        let rules = &self.article;

        let lead_image = match &rules.lead_image {
            Some(spec) => Some((compile_selector(site, &spec.selector)?, spec.attr.clone())),
            None => None,
        };
        let removals = rules
            .remove
            .iter()
            .map(|rule| rule.compile(site))
            .collect::<Result<Vec<_>, _>>()?;
        let quote_marker = match &rules.quote_marker {
            Some(rule) => Some(QuoteMarker {
                marker: compile_selector(site, &rule.marker)?,
                body: compile_selector(site, &rule.body)?,
            }),
            None => None,
        };

        Ok(CompiledSite {
            name: self.name.clone(),
            base_url,
            feed_url,
            body: compile_selector(site, &rules.body)?,
            content: rules
                .content
                .as_deref()
                .map(|css| compile_selector(site, css))
                .transpose()?,
            lead_image,
            description: rules
                .description
                .as_deref()
                .map(|css| compile_selector(site, css))
                .transpose()?,
            removals,
            blocks: BlockRules {
                image: compile_selector(site, &rules.image)?,
                quote: compile_selector(site, &rules.quote)?,
                quote_marker,
            },
        })
    }

    fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidUrl {
            site: self.name.clone(),
            url: self.base_url.clone(),
            source,
        })
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// A validated [`SiteConfig`], ready to parse articles.
#[derive(Debug, Clone)]
pub struct CompiledSite {
    name: String,
    base_url: Url,
    feed_url: Url,
    body: Selector,
    content: Option<Selector>,
    lead_image: Option<(Selector, String)>,
    description: Option<Selector>,
    removals: Vec<CompiledRule>,
    blocks: BlockRules,
}

impl CompiledSite {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    pub fn body(&self) -> &Selector {
        &self.body
    }

    pub fn content(&self) -> Option<&Selector> {
        self.content.as_ref()
    }

    /// Lead image selector and the attribute holding the URL.
    pub fn lead_image(&self) -> Option<(&Selector, &str)> {
        self.lead_image
            .as_ref()
            .map(|(selector, attr)| (selector, attr.as_str()))
    }

    pub fn description(&self) -> Option<&Selector> {
        self.description.as_ref()
    }

    pub fn removals(&self) -> &[CompiledRule] {
        &self.removals
    }

    pub fn block_rules(&self) -> &BlockRules {
        &self.blocks
    }

    /// Selectors whose matches must survive the empty-element cleanup.
    pub fn keep_selectors(&self) -> impl Iterator<Item = &Selector> {
        self.blocks.quote_marker.iter().map(|m| &m.marker)
    }
}

/// Sites by name.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: BTreeMap<String, SiteConfig>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `site`, replacing any site already registered under the same name.
    pub fn register(&mut self, site: SiteConfig) {
        self.sites.insert(site.name.clone(), site);
    }

    pub fn get(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.get(name)
    }

    /// Like [`get`](Self::get), but reports unknown names as a [`ConfigError`].
    pub fn require(&self, name: &str) -> Result<&SiteConfig, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownSite(name.to_string()))
    }

    /// The site whose base URL shares a host with `url`.
    pub fn for_url(&self, url: &Url) -> Option<&SiteConfig> {
        self.sites.values().find(|site| site.matches_url(url))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.values()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl FromIterator<SiteConfig> for SiteRegistry {
    fn from_iter<I: IntoIterator<Item = SiteConfig>>(iter: I) -> Self {
        let mut registry = Self::new();
        for site in iter {
            registry.register(site);
        }
        registry
    }
}
