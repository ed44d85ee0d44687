use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, Result};
use crate::platform::{self, Platform};
use crate::ratelimit::RateLimiter;
use crate::robots::RobotsTxt;
use crate::validate;

/// One entry from a blog's feed.
#[derive(Debug, Clone)]
pub struct Post {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    /// Raw HTML body, scanned for outbound citations.
    pub content_html: String,
    /// Title of the feed the post came from.
    pub blog_title: String,
}

/// How a probed site responded before any feed was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    /// Page loaded and showed blog signals (platform match, advertised
    /// feed, or bloggy navigation).
    BlogIndicators,
    /// Page loaded but nothing suggested a blog; the common feed paths
    /// are still worth one round of attempts.
    NoBlogIndicators,
    /// Network error, timeout, or an error status.
    Unreachable,
}

/// Result of probing a candidate blog's landing page.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub status: SiteStatus,
    /// Feed URLs to try, best guesses first. Empty iff unreachable.
    pub feed_candidates: Vec<String>,
    pub platform: Platform,
}

impl ProbeResult {
    pub fn unreachable() -> Self {
        Self {
            status: SiteStatus::Unreachable,
            feed_candidates: Vec::new(),
            platform: Platform::Custom,
        }
    }
}

/// The engine's network seam: probe a site for feeds, fetch a feed, ask
/// robots.txt for permission. The production implementation is
/// [`Fetcher`]; engine tests substitute a scripted source.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn probe(&self, url: &str) -> ProbeResult;
    async fn fetch_feed(&self, feed_url: &str, max_posts: usize) -> Result<Vec<Post>>;
    async fn robots_allowed(&self, url: &str) -> bool;
}

/// Configuration for the HTTP side of discovery.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    /// Short token matched against robots.txt user-agent groups.
    pub robots_token: String,
    pub request_timeout: Duration,
    /// Minimum delay between two requests to the same domain.
    pub min_request_interval: Duration,
    /// Upper bound on feed candidates collected per probe.
    pub max_feed_candidates: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "blogmap/{} (+https://github.com/blogmap/blogmap)",
                env!("CARGO_PKG_VERSION")
            ),
            robots_token: "blogmap".to_string(),
            request_timeout: Duration::from_secs(10),
            min_request_interval: Duration::from_secs(2),
            max_feed_candidates: 15,
        }
    }
}

/// Generic feed locations tried on every reachable site, after any
/// platform-specific and advertised feeds.
const COMMON_FEED_PATHS: &[&str] = &[
    "/feed/", "/feed", "/rss/", "/rss", "/atom/", "/atom",
    "/index.xml", "/rss.xml", "/feed.xml", "/atom.xml",
    "/blog/feed/", "/blog/feed", "/blog/rss/", "/blog/rss",
];

/// Anchor keywords that mark bloggy navigation.
const NAV_KEYWORDS: &[&str] = &[
    "blog", "rss", "feed", "atom", "subscribe", "news", "articles", "posts",
];

/// Sitemap locations probed when robots.txt names none.
const SITEMAP_FALLBACK_PATHS: &[&str] = &[
    "/sitemap.xml", "/sitemap_index.xml", "/sitemap-index.xml", "/rss-sitemap.xml",
];

/// `<loc>` keywords that make a sitemap entry worth trying as a feed.
const SITEMAP_FEED_KEYWORDS: &[&str] = &["feed", "rss", "atom", "blog"];

/// HTTP-backed [`FeedSource`] with per-domain rate limiting and a
/// per-host robots.txt cache.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
    limiter: RateLimiter,
    robots_cache: Mutex<HashMap<String, RobotsTxt>>,
}

impl Fetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(5))
            // Independent blogs run on all kinds of TLS setups; a broken
            // cert chain is not a reason to drop a node from the map.
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.min_request_interval),
            config,
            robots_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    /// Fetch and cache the robots.txt policy for one origin. Missing or
    /// unreadable policies parse as empty (allow everything, no sitemaps).
    async fn robots_for(&self, scheme: &str, authority: &str) -> RobotsTxt {
        {
            let cache = self.robots_cache.lock().await;
            if let Some(robots) = cache.get(authority) {
                return robots.clone();
            }
        }

        let robots_url = format!("{scheme}://{authority}/robots.txt");
        let robots = match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(text) => RobotsTxt::parse(&text),
                Err(_) => RobotsTxt::default(),
            },
            Ok(_) => RobotsTxt::default(),
            Err(err) => {
                warn!(robots_url, error = %err, "robots.txt fetch failed, allowing");
                RobotsTxt::default()
            }
        };

        self.robots_cache
            .lock()
            .await
            .insert(authority.to_string(), robots.clone());
        robots
    }

    /// Harvest feed-looking URLs from the site's sitemaps: `Sitemap:`
    /// directives in robots.txt first, the conventional locations as a
    /// fallback. Stops at the first sitemap that yields anything.
    async fn sitemap_feed_candidates(&self, page_url: &Url) -> Vec<String> {
        let Some(host) = page_url.host_str() else {
            return Vec::new();
        };
        let authority = match page_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let robots = self.robots_for(page_url.scheme(), &authority).await;

        let mut sitemap_urls: Vec<String> = robots.sitemaps().to_vec();
        if sitemap_urls.is_empty() {
            for path in SITEMAP_FALLBACK_PATHS {
                if let Ok(sitemap_url) = page_url.join(path) {
                    sitemap_urls.push(sitemap_url.to_string());
                }
            }
        }

        let domain = validate::extract_domain(page_url.as_str()).unwrap_or_default();
        let mut feeds = Vec::new();
        for sitemap_url in &sitemap_urls {
            self.limiter.acquire(&domain).await;
            let Ok(response) = self.client.get(sitemap_url).send().await else {
                continue;
            };
            if !response.status().is_success() {
                continue;
            }
            let Ok(body) = response.text().await else {
                continue;
            };
            for loc in sitemap_locations(&body) {
                let lower = loc.to_lowercase();
                if SITEMAP_FEED_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                    feeds.push(loc);
                }
            }
            if !feeds.is_empty() {
                debug!(sitemap_url, feeds = feeds.len(), "sitemap yielded feed candidates");
                break;
            }
        }
        feeds.truncate(10);
        feeds
    }

    /// Collect candidate feed URLs from a fetched landing page, in
    /// priority order: platform conventions, advertised `<link>` feeds,
    /// bloggy navigation targets, sitemap harvest, then the generic
    /// common paths.
    fn collect_feed_candidates(
        &self,
        page_url: &Url,
        body: &str,
        sitemap_feeds: &[String],
    ) -> (Vec<String>, Platform, bool) {
        let document = Html::parse_document(body);

        let generator_selector = Selector::parse(r#"meta[name="generator"]"#).expect("static selector");
        let generator = document
            .select(&generator_selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.to_string());

        let host = page_url.host_str().unwrap_or_default();
        let platform = platform::classify(host, generator.as_deref());

        let mut candidates: Vec<String> = Vec::new();
        let mut has_indicators = platform.is_known();

        for path in platform.feed_paths() {
            if let Ok(feed_url) = page_url.join(path) {
                candidates.push(feed_url.to_string());
            }
        }

        let alternate_selector = Selector::parse(
            r#"link[type="application/rss+xml"], link[type="application/atom+xml"]"#,
        )
        .expect("static selector");
        for link in document.select(&alternate_selector) {
            if let Some(href) = link.value().attr("href")
                && let Ok(feed_url) = page_url.join(href)
            {
                has_indicators = true;
                candidates.push(feed_url.to_string());
            }
        }

        let nav_selector = Selector::parse(
            "nav a[href], header a[href], footer a[href], aside a[href], menu a[href]",
        )
        .expect("static selector");
        for anchor in document.select(&nav_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let href_lower = href.to_lowercase();
            let text_lower = anchor.text().collect::<String>().to_lowercase();

            if !NAV_KEYWORDS
                .iter()
                .any(|kw| href_lower.contains(kw) || text_lower.contains(kw))
            {
                continue;
            }
            has_indicators = true;

            let Ok(target) = page_url.join(href) else {
                continue;
            };

            if href_lower.contains("blog") || text_lower.contains("blog") {
                let base = target.as_str().trim_end_matches('/');
                for suffix in ["/feed", "/rss", "/atom"] {
                    candidates.push(format!("{base}{suffix}"));
                }
            }
            if ["rss", "feed", "atom", ".xml"].iter().any(|kw| href_lower.contains(kw)) {
                candidates.push(target.to_string());
            }
        }

        if !sitemap_feeds.is_empty() {
            has_indicators = true;
            candidates.extend(sitemap_feeds.iter().cloned());
        }

        for path in COMMON_FEED_PATHS {
            if let Ok(feed_url) = page_url.join(path) {
                candidates.push(feed_url.to_string());
            }
        }

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|url| seen.insert(url.clone()));
        candidates.truncate(self.config.max_feed_candidates);

        (candidates, platform, has_indicators)
    }
}

impl FeedSource for Fetcher {
    /// Fetch a candidate's landing page and enumerate likely feed URLs.
    /// Any transport failure maps to `Unreachable`; this is a per-node
    /// outcome, never a crawl-fatal error.
    async fn probe(&self, url: &str) -> ProbeResult {
        let Ok(page_url) = Url::parse(url) else {
            return ProbeResult::unreachable();
        };
        let domain = validate::extract_domain(url).unwrap_or_default();
        self.limiter.acquire(&domain).await;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(url, error = %err, "probe request failed");
                return ProbeResult::unreachable();
            }
        };
        if let Err(err) = response.error_for_status_ref() {
            debug!(url, error = %err, "probe got error status");
            return ProbeResult::unreachable();
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!(url, error = %err, "probe body read failed");
                return ProbeResult::unreachable();
            }
        };

        let sitemap_feeds = self.sitemap_feed_candidates(&page_url).await;
        let (feed_candidates, platform, has_indicators) =
            self.collect_feed_candidates(&page_url, &body, &sitemap_feeds);

        let status = if has_indicators {
            SiteStatus::BlogIndicators
        } else {
            SiteStatus::NoBlogIndicators
        };
        debug!(
            url,
            candidates = feed_candidates.len(),
            platform = platform.as_str(),
            ?status,
            "probe complete"
        );

        ProbeResult { status, feed_candidates, platform }
    }

    /// Fetch and parse one feed, newest entries first, bounded by
    /// `max_posts`. Entries that cannot be mapped are skipped, not fatal.
    async fn fetch_feed(&self, feed_url: &str, max_posts: usize) -> Result<Vec<Post>> {
        let domain = validate::extract_domain(feed_url)
            .ok_or_else(|| FetchError::InvalidUrl(feed_url.to_string()))?;
        self.limiter.acquire(&domain).await;

        let response = self.client.get(feed_url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let feed = feed_rs::parser::parse(bytes.as_ref())
            .map_err(|err| FetchError::FeedParse(format!("{feed_url}: {err}")))?;
        if feed.entries.is_empty() {
            return Err(FetchError::EmptyFeed(feed_url.to_string()));
        }

        let blog_title = feed
            .title
            .map(|t| t.content)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| domain.clone());

        let mut posts: Vec<Post> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let link = entry.links.first().map(|l| l.href.clone())?;
                let content_html = entry
                    .content
                    .as_ref()
                    .and_then(|c| c.body.clone())
                    .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
                    .unwrap_or_default();
                Some(Post {
                    title: entry
                        .title
                        .map(|t| t.content)
                        .unwrap_or_else(|| "No Title".to_string()),
                    link,
                    published: entry.published.or(entry.updated),
                    summary: entry.summary.map(|s| truncate_chars(&s.content, 500)),
                    content_html,
                    blog_title: blog_title.clone(),
                })
            })
            .collect();

        // Newest first; undated entries sink to the end.
        posts.sort_by(|a, b| b.published.cmp(&a.published));
        posts.truncate(max_posts);

        debug!(feed_url, posts = posts.len(), "feed fetched");
        Ok(posts)
    }

    /// Best-effort robots.txt check for the URL's origin. Missing or
    /// unreadable robots.txt allows everything (fail-open politeness).
    async fn robots_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        let Some(host) = parsed.host_str() else {
            return true;
        };
        // Keep the port so non-default origins resolve their own policy.
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let robots = self.robots_for(parsed.scheme(), &authority).await;
        robots.allows(&self.config.robots_token, parsed.path())
    }
}

/// Pull `<loc>` entries out of a sitemap document with a plain text
/// scan; sitemaps in the wild are too messy for a strict XML parse.
fn sitemap_locations(body: &str) -> Vec<String> {
    let mut locations = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("<loc>") {
        rest = &rest[start + 5..];
        let Some(end) = rest.find("</loc>") else {
            break;
        };
        let loc = rest[..end].trim();
        if !loc.is_empty() {
            locations.push(loc.to_string());
        }
        rest = &rest[end + 6..];
    }
    locations
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sitemap_locations_survive_messy_documents() {
        let body = r#"<?xml version="1.0"?>
            <urlset><url><loc> https://example.com/feed.xml </loc></url>
            <url><loc>https://example.com/about</loc></url>
            <url><loc></loc></url>
            <url><loc>https://example.com/unclosed"#;
        assert_eq!(
            sitemap_locations(body),
            vec![
                "https://example.com/feed.xml".to_string(),
                "https://example.com/about".to_string(),
            ]
        );
        assert!(sitemap_locations("not xml at all").is_empty());
    }
}
