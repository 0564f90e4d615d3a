// ABOUTME: Preview record model produced by the listing parser.
// ABOUTME: Records are enriched with an image and description once the article page is parsed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lightweight summary of one article taken from a feed listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRecord {
    /// Absolute article URL.
    pub uri: String,
    pub published_at: DateTime<Utc>,
    pub title: String,
    /// Summary text; only filled when the site asks for it.
    pub preview_text: Option<String>,
    image: Option<String>,
    description: Option<String>,
}

impl PreviewRecord {
    pub fn new(
        uri: impl Into<String>,
        published_at: DateTime<Utc>,
        title: impl Into<String>,
        preview_text: Option<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            published_at,
            title: title.into(),
            preview_text,
            image: None,
            description: None,
        }
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Attaches the lead image found on the article page.
    pub fn set_image(&mut self, url: impl Into<String>) {
        self.image = Some(url.into());
    }

    /// Attaches the description found on the article page.
    pub fn set_description(&mut self, text: impl Into<String>) {
        self.description = Some(text.into());
    }
}
