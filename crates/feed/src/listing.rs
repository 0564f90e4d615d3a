// ABOUTME: Feed listing parser that turns an RSS document into ordered preview records.
// ABOUTME: Supports a strict XML reader and a regex item scanner for feeds that are not well-formed.

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::FeedError;
use crate::models::PreviewRecord;
use crate::text::{plain_text, strip_cdata};
use crate::time_parse::{normalize_timestamp, DateFormat};

static ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item\s*>").expect("valid item regex"));
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid title regex"));
// Opening tag must not be self-closing, or the capture would run on to the next </link>.
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<link\b(?:[^>]*[^/>])?>(.*?)</link\s*>").expect("valid link regex")
});
static LINK_HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(?:\w+:)?link\b[^>]*?\shref\s*=\s*["']([^"']+)["']"#)
        .expect("valid link href regex")
});
static PUBDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<pubdate\b[^>]*>(.*?)</pubdate\s*>").expect("valid pubDate regex")
});
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<description\b[^>]*>(.*?)</description\s*>")
        .expect("valid description regex")
});

/// How item boundaries are found in the feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingMode {
    /// Well-formed XML read event by event. Malformed documents fail.
    #[default]
    Strict,
    /// `<item>` blocks and their fields matched with regexes.
    ItemRegex,
}

/// What to do with an item that cannot be turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPolicy {
    #[default]
    Skip,
    Abort,
}

/// Bounds on the number of records a listing must and may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self { min: 10, max: 100 }
    }
}

/// Per-source listing settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingConfig {
    /// Base for relative item links.
    pub base_url: String,
    pub mode: ListingMode,
    pub date_format: DateFormat,
    /// Fill `preview_text` from each item's description.
    pub include_preview: bool,
    pub on_invalid_item: ItemPolicy,
}

impl ListingConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Raw field text of one item, still entity-escaped.
#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    /// Atom-style `href` link, used only when there is no text link.
    href_link: Option<String>,
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Description,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            n if n.eq_ignore_ascii_case(b"pubdate") => Some(Field::PubDate),
            _ => None,
        }
    }
}

impl RawItem {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::Description => &mut self.description,
        }
    }
}

/// Parses a feed document into preview records in document order.
///
/// Items that fail to convert are skipped or abort the listing according to
/// `config.on_invalid_item`. The listing fails with
/// [`FeedError::InsufficientListing`] when fewer than `limits.min` records
/// survive; otherwise the result is truncated to `limits.max`.
pub fn parse_listing(
    document: &str,
    config: &ListingConfig,
    limits: ListingLimits,
) -> Result<Vec<PreviewRecord>, FeedError> {
    let raw_items = match config.mode {
        ListingMode::Strict => read_items_strict(document)?,
        ListingMode::ItemRegex => read_items_regex(document),
    };
    let total = raw_items.len();

    let mut records = Vec::with_capacity(total.min(limits.max));
    for (index, raw) in raw_items.into_iter().enumerate() {
        match build_record(raw, config) {
            Ok(record) => records.push(record),
            Err(err) => match config.on_invalid_item {
                ItemPolicy::Skip => {
                    warn!(index, error = %err, "skipping feed item");
                }
                ItemPolicy::Abort => return Err(err),
            },
        }
    }

    if records.len() < limits.min {
        return Err(FeedError::too_few(records.len(), limits.min));
    }
    records.truncate(limits.max);

    debug!(
        items = total,
        records = records.len(),
        mode = ?config.mode,
        "parsed feed listing"
    );
    Ok(records)
}

fn read_items_strict(document: &str) -> Result<Vec<RawItem>, FeedError> {
    let mut reader = Reader::from_str(document);
    let mut items = Vec::new();
    let mut item: Option<RawItem> = None;
    // Field being captured and the element depth it was opened at.
    let mut capture: Option<(Field, usize)> = None;
    let mut buffer = String::new();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(FeedError::unreadable)?;
        match event {
            Event::Start(ref e) => {
                depth += 1;
                let name = e.local_name();
                if name.as_ref() == b"item" {
                    item = Some(RawItem::default());
                    capture = None;
                } else if let (Some(current), None) = (item.as_mut(), capture) {
                    if name.as_ref() == b"link" && current.href_link.is_none() {
                        current.href_link = href_attribute(e);
                    }
                    if let Some(field) = Field::from_local_name(name.as_ref()) {
                        capture = Some((field, depth));
                        buffer.clear();
                    }
                }
            }
            Event::Empty(ref e) => {
                // Atom-style <link href="..."/> inside an RSS item.
                if let (Some(current), None) = (item.as_mut(), capture) {
                    if e.local_name().as_ref() == b"link" && current.href_link.is_none() {
                        current.href_link = href_attribute(e);
                    }
                }
            }
            Event::Text(ref e) if capture.is_some() => {
                buffer.push_str(&String::from_utf8_lossy(e));
            }
            Event::CData(ref e) if capture.is_some() => {
                buffer.push_str(&String::from_utf8_lossy(e));
            }
            Event::GeneralRef(ref e) if capture.is_some() => {
                // Kept escaped; decoded together with the rest of the field.
                buffer.push('&');
                buffer.push_str(&String::from_utf8_lossy(e));
                buffer.push(';');
            }
            Event::End(ref e) => {
                if let Some((field, open_depth)) = capture {
                    if open_depth == depth {
                        if let Some(current) = item.as_mut() {
                            let slot = current.slot(field);
                            if slot.is_none() {
                                *slot = Some(std::mem::take(&mut buffer));
                            }
                        }
                        capture = None;
                    }
                }
                if e.local_name().as_ref() == b"item" {
                    if let Some(done) = item.take() {
                        items.push(done);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn href_attribute(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"href")
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn read_items_regex(document: &str) -> Vec<RawItem> {
    let field = |re: &Regex, body: &str| {
        re.captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| strip_cdata(m.as_str()).to_string())
    };

    ITEM_RE
        .captures_iter(document)
        .filter_map(|caps| caps.get(1))
        .map(|body| {
            let body = body.as_str();
            RawItem {
                title: field(&TITLE_RE, body),
                link: field(&LINK_RE, body),
                href_link: field(&LINK_HREF_RE, body),
                pub_date: field(&PUBDATE_RE, body),
                description: field(&DESCRIPTION_RE, body),
            }
        })
        .collect()
}

fn build_record(raw: RawItem, config: &ListingConfig) -> Result<PreviewRecord, FeedError> {
    let title = raw
        .title
        .as_deref()
        .map(plain_text)
        .filter(|t| !t.is_empty())
        .ok_or(FeedError::MissingElement("title"))?;
    let link = [raw.link.as_deref(), raw.href_link.as_deref()]
        .into_iter()
        .flatten()
        .map(plain_text)
        .find(|l| !l.is_empty())
        .ok_or(FeedError::MissingElement("link"))?;
    let pub_date = raw
        .pub_date
        .as_deref()
        .ok_or(FeedError::MissingElement("pubDate"))?;

    let uri = resolve_link(&config.base_url, &link)?;
    let published_at = normalize_timestamp(&plain_text(pub_date), &config.date_format)?;

    let preview_text = if config.include_preview {
        // Descriptions usually carry escaped HTML: decode once, then strip the markup.
        raw.description
            .as_deref()
            .map(|d| plain_text(&plain_text(d)))
            .filter(|d| !d.is_empty())
    } else {
        None
    };

    Ok(PreviewRecord::new(uri, published_at, title, preview_text))
}

/// Resolves an item link against the source base URL; only http(s) results are accepted.
pub fn resolve_link(base_url: &str, link: &str) -> Result<String, FeedError> {
    let invalid = |reason: String| FeedError::InvalidLink {
        link: link.to_string(),
        reason,
    };

    let resolved = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(base_url)
                .map_err(|e| invalid(format!("base URL {:?}: {}", base_url, e)))?;
            base.join(link).map_err(|e| invalid(e.to_string()))?
        }
        Err(e) => return Err(invalid(e.to_string())),
    };

    match resolved.scheme() {
        "http" | "https" => Ok(resolved.to_string()),
        other => Err(invalid(format!("unsupported scheme {:?}", other))),
    }
}
