// ABOUTME: Error types for article parsing including ErrorCode, ArticleError and ConfigError.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

use newsroom_feed::FeedError;
use serde::Serialize;

use crate::extractors::ownership::NodeKey;

/// Error codes representing different categories of article failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Fetch,
    EmptyArticle,
    OwnershipViolation,
    Config,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Fetch => "fetch error",
            ErrorCode::EmptyArticle => "empty article",
            ErrorCode::OwnershipViolation => "ownership violation",
            ErrorCode::Config => "configuration error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for per-article operations.
#[derive(Debug, thiserror::Error)]
pub struct ArticleError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ArticleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "newsroom: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ArticleError {
    fn with_code(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a Fetch error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Fetch, url, op, source)
    }

    /// Create an EmptyArticle error.
    pub fn empty_article(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::EmptyArticle, url, op, source)
    }

    /// Create an OwnershipViolation error carrying the violation as its source.
    pub fn ownership_violation(
        url: impl Into<String>,
        op: impl Into<String>,
        violation: OwnershipViolation,
    ) -> Self {
        Self::with_code(
            ErrorCode::OwnershipViolation,
            url,
            op,
            Some(anyhow::Error::new(violation)),
        )
    }

    /// Create a Config error.
    pub fn config(url: impl Into<String>, op: impl Into<String>, source: ConfigError) -> Self {
        Self::with_code(ErrorCode::Config, url, op, Some(anyhow::Error::new(source)))
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is an EmptyArticle error.
    pub fn is_empty_article(&self) -> bool {
        self.code == ErrorCode::EmptyArticle
    }

    /// Returns true if this is an OwnershipViolation error.
    pub fn is_ownership_violation(&self) -> bool {
        self.code == ErrorCode::OwnershipViolation
    }

    /// Returns true if this is a Config error.
    pub fn is_config(&self) -> bool {
        self.code == ErrorCode::Config
    }
}

/// A node was about to be registered to a second content block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node {key} is already registered to block slot {existing}")]
pub struct OwnershipViolation {
    pub key: NodeKey,
    pub existing: usize,
}

/// Invalid site configuration, reported when a site is compiled or loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("site {site:?}: invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        site: String,
        selector: String,
        reason: String,
    },

    #[error("site {site:?}: invalid text pattern {pattern:?}")]
    InvalidPattern {
        site: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("site {site:?}: invalid URL {url:?}")]
    InvalidUrl {
        site: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unknown site {0:?}")]
    UnknownSite(String),

    #[error("site registry could not be loaded")]
    Registry(#[source] anyhow::Error),
}

/// Failure of a whole site crawl. Per-article failures never end up here.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("site configuration is invalid")]
    Config(#[from] ConfigError),

    #[error("feed listing failed")]
    Listing(#[from] FeedError),
}
