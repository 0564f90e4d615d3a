// ABOUTME: Output types: content blocks, assembled post records and per-site crawl reports.
// ABOUTME: All of them serialize to the JSON printed by the newsroom CLI.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ArticleError;

/// Result type for per-article operations.
pub type Result<T> = std::result::Result<T, ArticleError>;

/// One unit of article content, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph(String),
    Quote(String),
    /// Absolute image URL.
    Image(String),
}

impl ContentBlock {
    /// The paragraph or quote text, or the image URL.
    pub fn value(&self) -> &str {
        match self {
            ContentBlock::Paragraph(s) | ContentBlock::Quote(s) | ContentBlock::Image(s) => s,
        }
    }
}

/// A fully parsed article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub uri: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub blocks: Vec<ContentBlock>,
}

impl PostRecord {
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Paragraph(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn quotes(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Quote(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// An article that could not be turned into a post.
#[derive(Debug)]
pub struct ArticleFailure {
    pub uri: String,
    pub error: ArticleError,
}

impl Serialize for ArticleFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ArticleFailure", 3)?;
        state.serialize_field("uri", &self.uri)?;
        state.serialize_field("code", &self.error.code)?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}

/// Posts and per-article failures from crawling one site.
#[derive(Debug, Serialize)]
pub struct CrawlReport {
    pub site: String,
    pub posts: Vec<PostRecord>,
    pub failures: Vec<ArticleFailure>,
}

impl CrawlReport {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            posts: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Articles attempted, successful or not.
    pub fn attempted(&self) -> usize {
        self.posts.len() + self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn blocks_serialize_as_tagged_values() {
        let blocks = vec![
            ContentBlock::Paragraph("Текст".to_string()),
            ContentBlock::Quote("Цитата".to_string()),
            ContentBlock::Image("https://example.com/a.jpg".to_string()),
        ];
        assert_eq!(
            serde_json::to_value(&blocks).unwrap(),
            json!([
                {"type": "paragraph", "value": "Текст"},
                {"type": "quote", "value": "Цитата"},
                {"type": "image", "value": "https://example.com/a.jpg"}
            ])
        );
    }

    #[test]
    fn failure_serializes_code_and_message() {
        let failure = ArticleFailure {
            uri: "https://example.com/news/2".to_string(),
            error: ArticleError::empty_article("https://example.com/news/2", "assemble", None),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["code"], "empty_article");
        assert_eq!(
            value["message"],
            "newsroom: assemble https://example.com/news/2: empty article"
        );
    }

    #[test]
    fn post_filters_blocks_by_kind() {
        let post = PostRecord {
            uri: "https://example.com/news/1".to_string(),
            title: "t".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 15, 7, 0, 0).unwrap(),
            image: None,
            description: None,
            blocks: vec![
                ContentBlock::Paragraph("a".to_string()),
                ContentBlock::Quote("b".to_string()),
                ContentBlock::Paragraph("c".to_string()),
            ],
        };
        assert_eq!(post.paragraphs().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(post.quotes().collect::<Vec<_>>(), vec!["b"]);
    }
}
