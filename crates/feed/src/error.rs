// ABOUTME: Error types for feed listing and timestamp parsing.
// ABOUTME: Provides FeedError plus the ListingShortfall cause attached to InsufficientListing.

use thiserror::Error;

/// Errors that can occur while turning a feed document into preview records.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The timestamp did not match the format the source is declared to use.
    #[error("malformed timestamp {value:?} (expected {format})")]
    MalformedTimestamp { value: String, format: String },

    /// The configured fallback UTC offset could not be parsed.
    #[error("invalid UTC offset {0:?}")]
    InvalidOffset(String),

    /// A feed item lacks a required element.
    #[error("feed item has no <{0}> element")]
    MissingElement(&'static str),

    /// A feed item link could not be resolved to an absolute URL.
    #[error("invalid item link {link:?}: {reason}")]
    InvalidLink { link: String, reason: String },

    /// Not enough valid records could be produced from the listing.
    #[error("insufficient listing")]
    InsufficientListing {
        #[source]
        source: ListingShortfall,
    },
}

/// Why a listing came up short. Kept as the source of `InsufficientListing`
/// so the cause chain survives to the caller.
#[derive(Debug, Error)]
pub enum ListingShortfall {
    /// The outer feed document could not be fetched or read at all.
    #[error("feed document could not be read")]
    Unreadable(#[source] anyhow::Error),

    /// The document was read but yielded too few valid items.
    #[error("found {found} valid items, need at least {required}")]
    TooFew { found: usize, required: usize },
}

impl FeedError {
    /// Creates an InsufficientListing error for an unreadable feed document.
    pub fn unreadable(cause: impl Into<anyhow::Error>) -> Self {
        FeedError::InsufficientListing {
            source: ListingShortfall::Unreadable(cause.into()),
        }
    }

    /// Creates an InsufficientListing error for an under-count.
    pub fn too_few(found: usize, required: usize) -> Self {
        FeedError::InsufficientListing {
            source: ListingShortfall::TooFew { found, required },
        }
    }

    /// Returns true if this error aborts the whole listing.
    pub fn is_insufficient_listing(&self) -> bool {
        matches!(self, FeedError::InsufficientListing { .. })
    }

    /// Returns true if this is a MalformedTimestamp error.
    pub fn is_malformed_timestamp(&self) -> bool {
        matches!(self, FeedError::MalformedTimestamp { .. })
    }
}
