// ABOUTME: Resource fetching for feeds and article pages over HTTP.
// ABOUTME: Handles status checks, content-length limits and charset decoding of legacy encodings.

use std::collections::HashMap;

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::debug;

use crate::error::ArticleError;
use crate::options::DEFAULT_MAX_CONTENT_LENGTH;

/// How many leading bytes are searched for an in-document charset declaration.
const SNIFF_LIMIT: usize = 2048;

static META_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
        .expect("valid meta charset regex")
});
static XML_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<\?xml[^>]+encoding\s*=\s*["']([a-z0-9_:.\-]+)["']"#)
        .expect("valid xml encoding regex")
});

/// Options for fetching a resource.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub max_content_length: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decodes the body using the charset from the content-type header, then
    /// an in-document declaration, then detection.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

fn encoding_for(label: &[u8]) -> Option<&'static encoding_rs::Encoding> {
    encoding_rs::Encoding::for_label(label)
}

/// Decodes a document using the charset from `content_type`, then an
/// in-document declaration, then detection. Also used for saved files.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(extract_charset)
        .and_then(|charset| encoding_for(charset.as_bytes()))
        .or_else(|| sniff_charset(body));

    let encoding = declared.unwrap_or_else(|| {
        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(body, true);
        detector.guess(None, true)
    });
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Charset from a `<meta charset>` / `http-equiv` tag or an XML declaration.
fn sniff_charset(body: &[u8]) -> Option<&'static encoding_rs::Encoding> {
    let head = &body[..body.len().min(SNIFF_LIMIT)];
    [&*XML_ENCODING_RE, &*META_CHARSET_RE]
        .iter()
        .find_map(|re| re.captures(head))
        .and_then(|caps| caps.get(1))
        .and_then(|m| encoding_for(m.as_bytes()))
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    lower.split(';').find_map(|part| {
        part.trim()
            .strip_prefix("charset=")
            .map(|charset| charset.trim_matches('"').trim_matches('\'').to_string())
    })
}

/// Fetch a resource from the given URL.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, ArticleError> {
    let parsed_url = url::Url::parse(url).map_err(|e| {
        ArticleError::fetch(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;
    if !matches!(parsed_url.scheme(), "http" | "https") {
        return Err(ArticleError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    let mut request = client.get(parsed_url);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        ArticleError::fetch(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
    })?;

    if let Some(len) = response.content_length() {
        if len > opts.max_content_length as u64 {
            return Err(ArticleError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large: {} bytes", len)),
            ));
        }
    }

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    if !(200..300).contains(&status) {
        return Err(ArticleError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {}", status)),
        ));
    }

    let body = response.bytes().await.map_err(|e| {
        ArticleError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("failed to read body: {}", e)),
        )
    })?;
    if body.len() > opts.max_content_length {
        return Err(ArticleError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large: {} bytes", body.len())),
        ));
    }

    debug!(url, status, bytes = body.len(), "fetched resource");
    Ok(FetchResult {
        status,
        url: url.to_string(),
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn create_test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("test-agent")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/test");
            then.status(200)
                .header("content-type", "text/plain; charset=utf-8")
                .body("привет");
        });

        let result = fetch(&create_test_client(), &server.url("/test"), &FetchOptions::default())
            .await
            .expect("fetch should succeed");
        mock.assert();
        assert_eq!(result.status, 200);
        assert_eq!(result.text(), "привет");
    }

    #[tokio::test]
    async fn fetch_sends_custom_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/h").header("x-newsroom", "1");
            then.status(200).body("ok");
        });

        let mut opts = FetchOptions::default();
        opts.headers.insert("x-newsroom".to_string(), "1".to_string());
        fetch(&create_test_client(), &server.url("/h"), &opts)
            .await
            .expect("fetch should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/notfound");
            then.status(404).body("not found");
        });

        let err = fetch(&create_test_client(), &server.url("/notfound"), &FetchOptions::default())
            .await
            .expect_err("should fail on 404");
        mock.assert();
        assert!(err.is_fetch());
        assert!(err.to_string().contains("HTTP status 404"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/big");
            then.status(200).body("x".repeat(64));
        });

        let opts = FetchOptions {
            max_content_length: 16,
            ..Default::default()
        };
        let err = fetch(&create_test_client(), &server.url("/big"), &opts)
            .await
            .expect_err("should fail on size");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn invalid_scheme_is_rejected() {
        let err = fetch(&create_test_client(), "ftp://example.com/feed", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn windows_1251_body_is_decoded_from_header() {
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode("Новости Гукова");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/cp1251");
            then.status(200)
                .header("content-type", "text/html; charset=windows-1251")
                .body(encoded.to_vec());
        });

        let result = fetch(&create_test_client(), &server.url("/cp1251"), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.text(), "Новости Гукова");
    }

    #[test]
    fn meta_charset_is_used_without_header() {
        let html = "<html><head><meta charset=\"windows-1251\"></head><body>Лента</body></html>";
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(html);
        assert_eq!(decode_body(&encoded, Some("text/html")), html);
    }

    #[test]
    fn xml_declaration_encoding_is_used() {
        let xml = "<?xml version=\"1.0\" encoding=\"windows-1251\"?><rss><title>Лента</title></rss>";
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(xml);
        assert_eq!(decode_body(&encoded, None), xml);
    }

    #[test]
    fn extract_charset_from_header() {
        assert_eq!(
            extract_charset("text/html; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(
            extract_charset("text/html; charset=\"Windows-1251\""),
            Some("windows-1251".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}
