use serde::{Deserialize, Serialize};

/// Blogging platform a discovered site appears to run on.
///
/// Classification is best-effort and never blocks discovery: anything we
/// cannot identify falls back to `Custom`. A known platform doubles as a
/// blog indicator during validation and supplies the conventional feed
/// paths to probe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    WordPress,
    Blogspot,
    Substack,
    Medium,
    Ghost,
    Tumblr,
    GithubPages,
    WriteAs,
    Custom,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::WordPress => "wordpress",
            Platform::Blogspot => "blogspot",
            Platform::Substack => "substack",
            Platform::Medium => "medium",
            Platform::Ghost => "ghost",
            Platform::Tumblr => "tumblr",
            Platform::GithubPages => "github_pages",
            Platform::WriteAs => "write_as",
            Platform::Custom => "custom",
        }
    }

    /// True for every variant except the `Custom` fallback.
    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Custom)
    }

    /// Feed locations this platform serves by convention, probed before
    /// the generic common paths.
    pub fn feed_paths(&self) -> &'static [&'static str] {
        match self {
            Platform::Substack | Platform::Medium => &["/feed"],
            Platform::Blogspot => &["/feeds/posts/default", "/feeds/posts/default?alt=rss"],
            Platform::WordPress => &["/feed/", "/feed"],
            Platform::Ghost => &["/rss/", "/rss"],
            Platform::Tumblr => &["/rss"],
            Platform::GithubPages => &["/feed.xml", "/atom.xml", "/index.xml"],
            Platform::WriteAs => &["/feed/"],
            Platform::Custom => &[],
        }
    }
}

/// Classify a site from its hostname and (when available) the content of
/// the page's `generator` meta tag or the feed's generator element.
pub fn classify(host: &str, generator: Option<&str>) -> Platform {
    let host = host.to_lowercase();

    if host.ends_with("substack.com") {
        return Platform::Substack;
    }
    if host.ends_with("blogspot.com") {
        return Platform::Blogspot;
    }
    if host.ends_with("medium.com") {
        return Platform::Medium;
    }
    if host.ends_with("ghost.io") {
        return Platform::Ghost;
    }
    if host.ends_with("tumblr.com") {
        return Platform::Tumblr;
    }
    if host.ends_with("github.io") {
        return Platform::GithubPages;
    }
    if host.ends_with("write.as") || host.ends_with("writeas.com") {
        return Platform::WriteAs;
    }
    if host.ends_with("wordpress.com") {
        return Platform::WordPress;
    }

    if let Some(generator) = generator {
        let generator = generator.to_lowercase();
        if generator.contains("wordpress") {
            return Platform::WordPress;
        }
        if generator.contains("ghost") {
            return Platform::Ghost;
        }
        if generator.contains("medium") {
            return Platform::Medium;
        }
        if generator.contains("tumblr") {
            return Platform::Tumblr;
        }
        if generator.contains("jekyll") || generator.contains("hugo") || generator.contains("zola")
        {
            // Static site generators commonly host on GitHub Pages, but the
            // hostname is the only reliable signal for that. Treat them as
            // custom blogs.
            return Platform::Custom;
        }
    }

    Platform::Custom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_hosted_platforms_by_hostname() {
        assert_eq!(classify("astralcodexten.substack.com", None), Platform::Substack);
        assert_eq!(classify("example.blogspot.com", None), Platform::Blogspot);
        assert_eq!(classify("medium.com", None), Platform::Medium);
        assert_eq!(classify("demo.ghost.io", None), Platform::Ghost);
        assert_eq!(classify("someone.tumblr.com", None), Platform::Tumblr);
        assert_eq!(classify("someone.github.io", None), Platform::GithubPages);
        assert_eq!(classify("myblog.wordpress.com", None), Platform::WordPress);
    }

    #[test]
    fn classifies_self_hosted_wordpress_by_generator() {
        assert_eq!(
            classify("example.com", Some("WordPress 6.4.2")),
            Platform::WordPress
        );
    }

    #[test]
    fn falls_back_to_custom() {
        assert_eq!(classify("example.com", None), Platform::Custom);
        assert_eq!(classify("example.com", Some("Hugo 0.121.1")), Platform::Custom);
    }

    #[test]
    fn known_platforms_have_feed_paths() {
        for platform in [
            Platform::WordPress,
            Platform::Blogspot,
            Platform::Substack,
            Platform::Medium,
            Platform::Ghost,
        ] {
            assert!(platform.is_known());
            assert!(!platform.feed_paths().is_empty());
        }
        assert!(Platform::Custom.feed_paths().is_empty());
    }
}
