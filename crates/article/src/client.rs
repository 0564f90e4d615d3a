// ABOUTME: The newsroom Client: HTTP page fetching and the per-site crawl driver.
// ABOUTME: crawl_site reads a feed listing, then fetches and parses its articles concurrently.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use newsroom_feed::{parse_listing, FeedError, ListingLimits, PreviewRecord};

use crate::article::parse_article;
use crate::error::{ArticleError, CrawlError};
use crate::extractors::{CompiledSite, SiteConfig};
use crate::options::{ClientBuilder, Options};
use crate::resource::{fetch, FetchOptions, FetchResult};
use crate::result::{ArticleFailure, CrawlReport, PostRecord};

/// Source of feed and article documents, keyed by absolute URL.
pub trait PageFetcher: Sync {
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<String, ArticleError>> + Send;
}

/// Reads and parses the feed listing of `site` under `limits`, applied as given.
/// [`SiteConfig::listing_limits`] merges a site's own overrides into defaults.
///
/// A feed that cannot be fetched is reported the same way as one that cannot
/// be read, as an insufficient listing caused by the fetch failure.
pub async fn fetch_listing<F: PageFetcher>(
    fetcher: &F,
    site: &SiteConfig,
    compiled: &CompiledSite,
    limits: ListingLimits,
) -> Result<Vec<PreviewRecord>, FeedError> {
    let feed = fetcher
        .fetch_page(compiled.feed_url().as_str())
        .await
        .map_err(FeedError::unreadable)?;
    parse_listing(&feed, &site.listing_config(), limits)
}

/// Crawls one site: the listing first, then every listed article.
///
/// Articles are fetched up to `concurrency` at a time and reported in listing
/// order. An article that fails is recorded with its URI and does not stop
/// the crawl; only a listing failure does.
#[instrument(skip_all, fields(site = %site.name))]
pub async fn crawl_site<F: PageFetcher>(
    fetcher: &F,
    site: &SiteConfig,
    compiled: &CompiledSite,
    limits: ListingLimits,
    concurrency: usize,
) -> Result<CrawlReport, CrawlError> {
    let previews = fetch_listing(fetcher, site, compiled, limits).await?;
    info!(records = previews.len(), "parsed feed listing");

    let outcomes: Vec<(String, Result<PostRecord, ArticleError>)> = stream::iter(previews)
        .map(|preview| async move {
            let uri = preview.uri.clone();
            let outcome = match fetcher.fetch_page(&uri).await {
                Ok(page) => parse_article(compiled, preview, &page),
                Err(err) => Err(err),
            };
            (uri, outcome)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = CrawlReport::new(&site.name);
    for (uri, outcome) in outcomes {
        match outcome {
            Ok(post) => report.posts.push(post),
            Err(error) => {
                warn!(uri = %uri, code = %error.code, error = %error, "article failed");
                report.failures.push(ArticleFailure { uri, error });
            }
        }
    }
    info!(
        posts = report.posts.len(),
        failures = report.failures.len(),
        "crawled site"
    );
    Ok(report)
}

/// The main newsroom client for fetching and parsing news sites.
pub struct Client {
    opts: Options,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    ///
    /// # Panics
    ///
    /// Panics if no HTTP client was supplied and the default one cannot be built.
    pub fn new(opts: Options) -> Self {
        let http_client = opts.http_client.clone().unwrap_or_else(|| {
            reqwest::Client::builder()
                .user_agent(&opts.user_agent)
                .timeout(opts.timeout)
                .cookie_store(true)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .expect("failed to build HTTP client")
        });
        Self { opts, http_client }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Fetches `url` with the client's headers and size limit.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, ArticleError> {
        let fetch_opts = FetchOptions {
            headers: self.opts.headers.clone(),
            max_content_length: self.opts.max_content_length,
        };
        fetch(&self.http_client, url, &fetch_opts).await
    }

    /// Crawls `site` with the client's concurrency. The site's own listing
    /// limits take precedence over the client's.
    pub async fn crawl(&self, site: &SiteConfig) -> Result<CrawlReport, CrawlError> {
        self.crawl_with_limits(site, site.listing_limits(self.opts.limits))
            .await
    }

    /// Crawls `site` with exactly `limits`, ignoring the site's overrides.
    pub async fn crawl_with_limits(
        &self,
        site: &SiteConfig,
        limits: ListingLimits,
    ) -> Result<CrawlReport, CrawlError> {
        let compiled = site.compile()?;
        crawl_site(self, site, &compiled, limits, self.opts.concurrency).await
    }

    /// Fetches and parses the feed listing of `site`.
    pub async fn listing(&self, site: &SiteConfig) -> Result<Vec<PreviewRecord>, CrawlError> {
        let compiled = site.compile()?;
        let limits = site.listing_limits(self.opts.limits);
        Ok(fetch_listing(self, site, &compiled, limits).await?)
    }

    /// Fetches the article behind `preview` and parses it with the rules of `site`.
    ///
    /// A site that does not compile is reported as a `Config` error for this article.
    pub async fn parse(
        &self,
        site: &SiteConfig,
        preview: PreviewRecord,
    ) -> Result<PostRecord, ArticleError> {
        let compiled = site
            .compile()
            .map_err(|err| ArticleError::config(&preview.uri, "compile site", err))?;
        let page = self.fetch_page(&preview.uri).await?;
        parse_article(&compiled, preview, &page)
    }
}

impl PageFetcher for Client {
    async fn fetch_page(&self, url: &str) -> Result<String, ArticleError> {
        self.fetch(url).await.map(|result| result.text())
    }
}
