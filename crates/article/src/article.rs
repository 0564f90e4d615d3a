// ABOUTME: Article page pipeline: lead image, body selection, description, purification and extraction.
// ABOUTME: parse_article turns one fetched page plus its preview record into a PostRecord.

use anyhow::anyhow;
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

use newsroom_feed::PreviewRecord;

use crate::assemble::assemble;
use crate::dom::purify::Purifier;
use crate::dom::text::collect_text;
use crate::dom::ArticleFragment;
use crate::error::ArticleError;
use crate::extractors::media::resolve_image_url;
use crate::extractors::{CompiledSite, ContentBlockExtractor, RootBoundary};
use crate::result::PostRecord;

/// Parses the HTML of one article page.
///
/// The lead image is read from the whole page and resolved against the
/// article URI. The description, when the site declares one, is taken from
/// the first matching element inside the body and removed from it before the
/// body is purified and split into content blocks.
#[instrument(level = "debug", skip_all, fields(site = site.name(), uri = %preview.uri))]
pub fn parse_article(
    site: &CompiledSite,
    mut preview: PreviewRecord,
    page: &str,
) -> Result<PostRecord, ArticleError> {
    // Joining keeps absolute URIs as they are and resolves relative ones against the site.
    let page_url = site.base_url().join(&preview.uri).ok();
    let html = Html::parse_document(page);

    if let Some(image) = lead_image(&html, site, page_url.as_ref()) {
        debug!(image = %image, "resolved lead image");
        preview.set_image(image);
    }

    let Some(body) = html.select(site.body()).next().map(|el| el.id()) else {
        return Err(ArticleError::empty_article(
            &preview.uri,
            "select body",
            Some(anyhow!("no element matches the body selector")),
        ));
    };
    let mut fragment = ArticleFragment::new(html, body).ok_or_else(|| {
        ArticleError::empty_article(&preview.uri, "select body", None)
    })?;

    if let Some(selector) = site.description() {
        if let Some(id) = fragment.select(selector).first().copied() {
            let text = fragment
                .node(id)
                .map(collect_text)
                .unwrap_or_default();
            if !text.is_empty() {
                preview.set_description(text);
                fragment.detach(id);
            }
        }
    }

    if let Some(selector) = site.content() {
        match fragment.select(selector).first().copied() {
            Some(id) => {
                fragment = fragment.narrow(id).ok_or_else(|| {
                    ArticleError::empty_article(&preview.uri, "select content", None)
                })?;
            }
            None => debug!("content selector matched nothing; using the whole body"),
        }
    }
    if let Some(url) = page_url {
        fragment = fragment.with_url(url);
    }

    let removed = Purifier::new(site.removals())
        .keep(site.keep_selectors())
        .purify(&mut fragment);

    let rules = site.block_rules();
    let boundary = RootBoundary::compute(&fragment, &rules.quote);
    let extraction = ContentBlockExtractor::new(rules)
        .extract(&fragment, &boundary)
        .map_err(|violation| ArticleError::ownership_violation(&preview.uri, "extract", violation))?;

    debug!(
        removed,
        boundary = boundary.len(),
        blocks = extraction.blocks.len(),
        "parsed article body"
    );
    assemble(preview, extraction.blocks)
}

fn lead_image(html: &Html, site: &CompiledSite, page_url: Option<&Url>) -> Option<String> {
    let (selector, attr) = site.lead_image()?;
    html.select(selector)
        .filter_map(|el| el.value().attr(attr))
        .find_map(|value| resolve_image_url(value, page_url))
}
