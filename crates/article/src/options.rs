// ABOUTME: Configuration options for the newsroom Client and the ClientBuilder fluent API.
// ABOUTME: Covers HTTP settings, crawl concurrency and the listing limits applied to every feed.

use std::collections::HashMap;
use std::time::Duration;

use newsroom_feed::ListingLimits;

use crate::client::Client;

/// Default cap on a fetched feed or article body.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Configuration options for the newsroom client.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    /// Article pages fetched at the same time during a crawl.
    pub concurrency: usize,
    /// Limits for sites that do not override them.
    pub limits: ListingLimits,
    pub max_content_length: usize,
    pub http_client: Option<reqwest::Client>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Newsroom/1.0".to_string(),
            headers: HashMap::new(),
            concurrency: 4,
            limits: ListingLimits::default(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            http_client: None,
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Set how many article pages a crawl fetches at once. Zero is treated as one.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.opts.concurrency = concurrency.max(1);
        self
    }

    /// Set the default listing limits.
    pub fn limits(mut self, limits: ListingLimits) -> Self {
        self.opts.limits = limits;
        self
    }

    pub fn max_content_length(mut self, bytes: usize) -> Self {
        self.opts.max_content_length = bytes;
        self
    }

    /// Use a custom HTTP client. Timeout and user agent options are then ignored.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self.opts)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
