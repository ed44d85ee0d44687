use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// TLDs a candidate domain must end with to be considered at all.
pub const ALLOWED_TLDS: &[&str] = &[
    // Generic
    ".com", ".org", ".net", ".edu", ".gov", ".mil", ".int",
    // Tech/web
    ".io", ".co", ".ai", ".dev", ".app", ".me", ".info", ".biz", ".xyz", ".tech", ".site",
    ".online",
    // Common country codes
    ".uk", ".ca", ".au", ".nz", ".de", ".fr", ".jp", ".tr", ".br", ".in", ".us", ".eu", ".nl",
    ".se", ".no", ".es", ".it", ".ch", ".at", ".dk", ".be", ".pl", ".ru", ".cn", ".kr", ".sg",
    ".hk", ".tw",
];

/// Domains that are never blogs: social networks, code hosts, reference
/// sites, CDNs. Matched exactly and as a suffix (`mobile.twitter.com`).
pub const SKIP_DOMAINS: &[&str] = &[
    "twitter.com", "x.com", "facebook.com", "linkedin.com",
    "youtube.com", "github.com", "arxiv.org", "wikipedia.org",
    "doi.org", "jstor.org", "researchgate.net", "scholar.google.com",
    "amazon.com", "reddit.com", "stackoverflow.com", "google.com",
    "microsoft.com", "apple.com", "cran.r-project.org", "pypi.org",
    "imgur.com", "gstatic.com", "googleapis.com", "cloudflare.com",
    "feedburner.com", "gravatar.com", "wp.com",
];

/// Large organizations that will not host stray blog subdomains: one
/// failure anywhere under the base domain blacklists the whole thing.
pub const BLACKLIST_BASE_DOMAINS: &[&str] = &[
    "github.com", "microsoft.com", "google.com", "apple.com",
    "facebook.com", "amazon.com", "youtube.com", "twitter.com",
    "linkedin.com", "reddit.com", "stackoverflow.com",
    "wikipedia.org", "arxiv.org",
];

/// File extensions we refuse to follow.
pub const DANGEROUS_EXTENSIONS: &[&str] = &[
    ".exe", ".sh", ".bash", ".bat", ".cmd", ".scr",
    ".vbs", ".jar", ".deb", ".rpm", ".dmg",
    ".pkg", ".msi", ".dll", ".so", ".dylib", ".bin",
];

/// Substrings that mark a URL as likely malicious or off-topic.
const SUSPICIOUS_PATTERNS: &[&str] = &[
    "download", "exec", "install", "setup",
    "/bin/", "/sbin/", "/usr/bin/",
    "malware", "virus", "exploit", "hack",
    "phishing", "scam", "fraud",
];

/// Substrings in a URL that suggest the site is a blog.
const BLOG_INDICATORS: &[&str] = &[
    "blog", "posts", "articles", "wordpress", "blogspot", "medium.com",
    "substack", "ghost.io", "write.as", "tumblr", "github.io", "netlify.app",
];

/// Outcome of the cheap validation gates. `Ok` only means the candidate
/// survived the offline checks; robots.txt and feed reachability are
/// verified by the engine afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    DisallowedTld,
    SkipListed,
    UnsafeUrl,
}

/// Offline validation gates, cheapest first. Holds the configured
/// allow/skip lists so tests can swap them out.
#[derive(Debug, Clone)]
pub struct Validator {
    allowed_tlds: Vec<String>,
    skip_domains: HashSet<String>,
    blacklist_base_domains: HashSet<String>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            allowed_tlds: ALLOWED_TLDS.iter().map(|s| s.to_string()).collect(),
            skip_domains: SKIP_DOMAINS.iter().map(|s| s.to_string()).collect(),
            blacklist_base_domains: BLACKLIST_BASE_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the offline gates in order, short-circuiting on the first
    /// failure: TLD allow-list, skip-list, dangerous-URL patterns.
    pub fn check(&self, url: &str) -> Verdict {
        let Some(domain) = extract_domain(url) else {
            return Verdict::UnsafeUrl;
        };

        if !self.has_allowed_tld(&domain) {
            return Verdict::DisallowedTld;
        }
        if self.is_skip_listed(&domain) {
            return Verdict::SkipListed;
        }
        if !is_safe_url(url) {
            return Verdict::UnsafeUrl;
        }

        Verdict::Ok
    }

    pub fn has_allowed_tld(&self, domain: &str) -> bool {
        self.allowed_tlds.iter().any(|tld| domain.ends_with(tld))
    }

    /// Exact or suffix match against the skip-list, so `en.wikipedia.org`
    /// is caught by the `wikipedia.org` entry.
    pub fn is_skip_listed(&self, domain: &str) -> bool {
        self.skip_domains.iter().any(|skip| {
            domain == skip || domain.ends_with(&format!(".{skip}"))
        })
    }

    /// Whether failures under this base domain should blacklist it whole.
    pub fn is_major_site(&self, base_domain: &str) -> bool {
        self.blacklist_base_domains.contains(base_domain)
    }

    /// Heuristic filter for extracted links: safe, allowed TLD, not
    /// skip-listed, and either carries a blog indicator or looks like a
    /// small personal/organizational domain.
    pub fn is_likely_blog(&self, url: &str) -> bool {
        if self.check(url) != Verdict::Ok {
            return false;
        }
        let Some(domain) = extract_domain(url) else {
            return false;
        };

        let url_lower = url.to_lowercase();
        if BLOG_INDICATORS.iter().any(|ind| url_lower.contains(ind)) {
            return true;
        }

        // Bare domains with at most one subdomain level tend to be
        // personal sites worth probing.
        domain.matches('.').count() <= 2
    }
}

/// Whether the URL points at plain content rather than an executable
/// download or a known-bad pattern.
pub fn is_safe_url(url: &str) -> bool {
    let url_lower = url.to_lowercase();
    let path = Url::parse(&url_lower)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url_lower.clone());

    for ext in DANGEROUS_EXTENSIONS {
        if path.ends_with(ext) {
            debug!(url, ext, "blocked dangerous URL");
            return false;
        }
    }

    for pattern in SUSPICIOUS_PATTERNS {
        if url_lower.contains(pattern) {
            // Blog posts legitimately talk about downloads and installs.
            if matches!(*pattern, "download" | "install")
                && ["blog", "post", "article"].iter().any(|w| url_lower.contains(w))
            {
                continue;
            }
            debug!(url, pattern, "blocked suspicious URL");
            return false;
        }
    }

    true
}

/// Normalize a URL to its identity domain: host, lowercased, with any
/// `www.` prefix stripped.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Reduce a domain to its registrable base: `blog.example.com` becomes
/// `example.com`. Keeps three labels for second-level registries like
/// `.co.uk`.
pub fn base_domain(domain: &str) -> String {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() <= 2 {
        return domain.to_string();
    }
    if matches!(parts[parts.len() - 2], "co" | "com" | "ac" | "gov" | "org" | "net") {
        return parts[parts.len() - 3..].join(".");
    }
    parts[parts.len() - 2..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_domain_normalizes() {
        assert_eq!(extract_domain("https://WWW.Example.COM/blog"), Some("example.com".into()));
        assert_eq!(extract_domain("http://blog.example.io"), Some("blog.example.io".into()));
        assert_eq!(extract_domain("not a url"), None);
    }

    #[test]
    fn base_domain_handles_subdomains() {
        assert_eq!(base_domain("blog.example.com"), "example.com");
        assert_eq!(base_domain("example.com"), "example.com");
        assert_eq!(base_domain("news.bbc.co.uk"), "bbc.co.uk");
        assert_eq!(base_domain("a.b.c.example.org"), "example.org");
    }

    #[test]
    fn tld_gate_rejects_unlisted_tlds() {
        let v = Validator::new();
        assert_eq!(v.check("https://example.zip/"), Verdict::DisallowedTld);
        assert_eq!(v.check("https://example.com/"), Verdict::Ok);
        assert_eq!(v.check("https://example.dev/"), Verdict::Ok);
    }

    #[test]
    fn skip_list_matches_exact_and_suffix() {
        let v = Validator::new();
        assert_eq!(v.check("https://twitter.com/someone"), Verdict::SkipListed);
        assert_eq!(v.check("https://mobile.twitter.com/someone"), Verdict::SkipListed);
        assert_eq!(v.check("https://en.wikipedia.org/wiki/Blog"), Verdict::SkipListed);
        // Not a suffix match: "nottwitter.com" is a different domain.
        assert_eq!(v.check("https://nottwitter.com/"), Verdict::Ok);
    }

    #[test]
    fn dangerous_extensions_are_blocked() {
        let v = Validator::new();
        assert_eq!(v.check("https://example.com/payload.exe"), Verdict::UnsafeUrl);
        assert_eq!(v.check("https://example.com/lib.dll"), Verdict::UnsafeUrl);
        assert!(!is_safe_url("https://example.com/setup.msi"));
    }

    #[test]
    fn suspicious_patterns_are_blocked_with_blog_exemption() {
        assert!(!is_safe_url("https://example.com/malware-kit"));
        assert!(!is_safe_url("https://example.com/download/tool"));
        // "download" inside a blog path is fine.
        assert!(is_safe_url("https://example.com/blog/download-stats-2024"));
    }

    #[test]
    fn likely_blog_heuristics() {
        let v = Validator::new();
        assert!(v.is_likely_blog("https://example.com/blog/"));
        assert!(v.is_likely_blog("https://someone.substack.com/"));
        assert!(v.is_likely_blog("https://c.io/"));
        // Skip-listed domains are never blogs, indicator or not.
        assert!(!v.is_likely_blog("https://github.com/someone/blog"));
        // Deeply nested hosts without indicators are not worth probing.
        assert!(!v.is_likely_blog("https://a.b.c.d.example.com/"));
    }

    #[test]
    fn major_site_lookup() {
        let v = Validator::new();
        assert!(v.is_major_site("github.com"));
        assert!(!v.is_major_site("example.com"));
    }
}
