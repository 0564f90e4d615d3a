// ABOUTME: CLI for crawling news sites and parsing feeds or article pages.
// ABOUTME: Prints JSON on stdout; logs go to stderr and are filtered with RUST_LOG.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use newsroom_article::resource::decode_body;
use newsroom_article::{
    load_builtin_registry, load_registry_from_path, parse_article, Client, SiteRegistry,
};
use newsroom_feed::{parse_listing, ListingLimits, PreviewRecord};
use serde_json::{json, Value};
use tracing::{error, info};
use url::Url;

/// Turn news site feeds and article pages into structured JSON posts.
#[derive(Parser, Debug)]
#[command(name = "newsroom")]
#[command(about = "Crawl news sites and print their posts as JSON", long_about = None)]
struct Cli {
    /// Site registry file (JSON array of sites). Defaults to the bundled sites.
    #[arg(long, global = true)]
    sites: Option<PathBuf>,

    /// Output compact JSON instead of pretty.
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch each site's feed and articles and print one report per site.
    Crawl(CrawlArgs),
    /// Parse a saved feed file for a site.
    Listing(ListingArgs),
    /// Parse an article page, saved or fetched.
    Article(ArticleArgs),
    /// List the sites in the registry.
    Sites,
}

#[derive(Args, Debug)]
struct LimitArgs {
    /// Minimum number of valid feed items.
    #[arg(long)]
    min: Option<usize>,

    /// Maximum number of feed items to keep.
    #[arg(long)]
    max: Option<usize>,
}

impl LimitArgs {
    /// Flags take precedence over `defaults`.
    fn apply(&self, defaults: ListingLimits) -> ListingLimits {
        ListingLimits {
            min: self.min.unwrap_or(defaults.min),
            max: self.max.unwrap_or(defaults.max),
        }
    }
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Site name; repeat for several. Defaults to every registered site.
    #[arg(long)]
    site: Vec<String>,

    #[command(flatten)]
    limits: LimitArgs,

    /// Article pages fetched at once per site.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[derive(Args, Debug)]
struct ListingArgs {
    #[arg(long)]
    site: String,

    /// Saved feed document.
    #[arg(long)]
    feed: PathBuf,

    #[command(flatten)]
    limits: LimitArgs,
}

#[derive(Args, Debug)]
struct ArticleArgs {
    /// Site name. Defaults to the registered site whose host matches --url.
    #[arg(long)]
    site: Option<String>,

    /// Saved article page. Without it the page is fetched from --url.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Article URL, used to resolve relative links and images.
    #[arg(long)]
    url: String,

    #[arg(long, default_value = "")]
    title: String,

    /// Publish time (RFC 3339). Defaults to now.
    #[arg(long)]
    published: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let registry = load_registry(cli.sites.as_deref())?;
    let (output, ok) = match &cli.command {
        Command::Crawl(args) => crawl(&registry, args).await?,
        Command::Listing(args) => (listing(&registry, args)?, true),
        Command::Article(args) => (article(&registry, args).await?, true),
        Command::Sites => (sites(&registry), true),
    };

    if cli.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

fn load_registry(path: Option<&Path>) -> Result<SiteRegistry> {
    match path {
        Some(path) => load_registry_from_path(path)
            .with_context(|| format!("loading sites from {}", path.display())),
        None => Ok(load_builtin_registry()),
    }
}

/// Reads a saved document, honouring any charset it declares.
fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(decode_body(&bytes, None))
}

/// Crawls the selected sites. The flag is false when any site failed.
async fn crawl(registry: &SiteRegistry, args: &CrawlArgs) -> Result<(Value, bool)> {
    let names: Vec<String> = if args.site.is_empty() {
        registry.names().map(str::to_string).collect()
    } else {
        args.site.clone()
    };
    if names.is_empty() {
        bail!("no sites to crawl");
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .concurrency(args.concurrency)
        .build();

    let mut reports = Vec::with_capacity(names.len());
    let mut ok = true;
    for name in &names {
        let site = registry.require(name)?;
        let limits = args.limits.apply(site.listing_limits(ListingLimits::default()));
        info!(site = %name, min = limits.min, max = limits.max, "crawling");
        match client.crawl_with_limits(site, limits).await {
            Ok(report) => reports.push(serde_json::to_value(&report)?),
            Err(err) => {
                ok = false;
                error!(site = %name, error = %err, "crawl failed");
                reports.push(json!({
                    "site": name,
                    "error": format!("{:#}", anyhow::Error::new(err)),
                }));
            }
        }
    }
    Ok((Value::Array(reports), ok))
}

fn listing(registry: &SiteRegistry, args: &ListingArgs) -> Result<Value> {
    let site = registry.require(&args.site)?;
    let feed = read_document(&args.feed)?;
    let limits = args.limits.apply(site.listing_limits(ListingLimits::default()));
    let records = parse_listing(&feed, &site.listing_config(), limits)
        .with_context(|| format!("parsing feed {}", args.feed.display()))?;
    Ok(serde_json::to_value(records)?)
}

async fn article(registry: &SiteRegistry, args: &ArticleArgs) -> Result<Value> {
    let url = Url::parse(&args.url).with_context(|| format!("invalid --url {}", args.url))?;
    let site = match &args.site {
        Some(name) => registry.require(name)?,
        None => registry
            .for_url(&url)
            .with_context(|| format!("no registered site matches {}", url))?,
    };

    let preview = PreviewRecord::new(
        url.as_str(),
        args.published.unwrap_or_else(Utc::now),
        args.title.as_str(),
        None,
    );
    let post = match &args.html {
        Some(path) => {
            let compiled = site.compile()?;
            let page = read_document(path)?;
            parse_article(&compiled, preview, &page)?
        }
        None => Client::builder().build().parse(site, preview).await?,
    };
    Ok(serde_json::to_value(post)?)
}

fn sites(registry: &SiteRegistry) -> Value {
    let sites: Vec<Value> = registry
        .iter()
        .map(|site| {
            json!({
                "name": site.name,
                "base_url": site.base_url,
                "feed_url": site.feed_url().ok().map(|u| u.to_string()),
            })
        })
        .collect();
    Value::Array(sites)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn limit_flags_override_defaults() {
        let args = LimitArgs {
            min: Some(1),
            max: None,
        };
        assert_eq!(
            args.apply(ListingLimits::default()),
            ListingLimits { min: 1, max: 100 }
        );
    }

    #[test]
    fn parses_crawl_with_repeated_sites() {
        let cli = Cli::try_parse_from([
            "newsroom", "crawl", "--site", "zvezda", "--site", "lgototvet", "--min", "3", "--compact",
        ])
        .unwrap();
        assert!(cli.compact);
        match cli.command {
            Command::Crawl(args) => {
                assert_eq!(args.site, vec!["zvezda", "lgototvet"]);
                assert_eq!(args.limits.min, Some(3));
                assert_eq!(args.concurrency, 4);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
