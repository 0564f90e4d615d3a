// ABOUTME: Feed listing library for newsroom.
// ABOUTME: Parses RSS listings into preview records with normalized UTC timestamps.

pub mod error;
pub mod listing;
pub mod models;
pub mod text;
pub mod time_parse;

pub use error::{FeedError, ListingShortfall};
pub use listing::{parse_listing, resolve_link, ItemPolicy, ListingConfig, ListingLimits, ListingMode};
pub use models::PreviewRecord;
pub use text::{normalize_whitespace, plain_text};
pub use time_parse::{normalize_timestamp, parse_flexible_time, DateFormat};
