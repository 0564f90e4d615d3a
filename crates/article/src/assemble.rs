// ABOUTME: Combines a feed preview record with extracted content blocks into a PostRecord.
// ABOUTME: An article without any blocks is rejected as empty.

use newsroom_feed::PreviewRecord;

use crate::error::ArticleError;
use crate::result::{ContentBlock, PostRecord};

/// Builds the final post from its listing entry and body blocks.
pub fn assemble(preview: PreviewRecord, blocks: Vec<ContentBlock>) -> Result<PostRecord, ArticleError> {
    if blocks.is_empty() {
        return Err(ArticleError::empty_article(
            preview.uri,
            "assemble",
            Some(anyhow::anyhow!("no content blocks after purification")),
        ));
    }
    let image = preview.image().map(str::to_string);
    let description = preview.description().map(str::to_string);
    Ok(PostRecord {
        uri: preview.uri,
        title: preview.title,
        published_at: preview.published_at,
        image,
        description,
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn preview() -> PreviewRecord {
        PreviewRecord::new(
            "https://example.com/news/1",
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            "Заголовок",
            None,
        )
    }

    #[test]
    fn carries_preview_fields() {
        let mut preview = preview();
        preview.set_image("https://example.com/img/a.jpg");
        preview.set_description("Кратко");
        let post = assemble(preview, vec![ContentBlock::Paragraph("Текст".into())]).unwrap();
        assert_eq!(post.title, "Заголовок");
        assert_eq!(post.image.as_deref(), Some("https://example.com/img/a.jpg"));
        assert_eq!(post.description.as_deref(), Some("Кратко"));
        assert_eq!(post.blocks.len(), 1);
    }

    #[test]
    fn no_blocks_is_an_empty_article() {
        let err = assemble(preview(), Vec::new()).unwrap_err();
        assert!(err.is_empty_article());
        assert_eq!(err.url, "https://example.com/news/1");
    }
}
