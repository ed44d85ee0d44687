use scraper::{Html, Selector};
use url::Url;

use crate::validate::Validator;

/// Scan a post body for outbound links that look like blogs.
///
/// Anchors are resolved against `source_url`, filtered through the
/// offline validation gates and the blog heuristic, then normalized to
/// their origin (`scheme://host`) and deduplicated within the post.
pub fn extract_blog_links(content: &str, source_url: &str, validator: &Validator) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }

    let document = Html::parse_fragment(content);
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_url(source_url, href) else {
            continue;
        };
        if !validator.is_likely_blog(absolute.as_str()) {
            continue;
        }

        let root = origin_url(&absolute);
        if seen.insert(root.clone()) {
            links.push(root);
        }
    }

    links
}

/// Resolve an href against its page URL, dropping non-HTTP schemes and
/// fragments.
fn resolve_url(base: &str, href: &str) -> Option<Url> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
        || href.starts_with("ftp:")
        || href.starts_with('#')
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

/// Reduce a URL to its root: `https://example.com/a/b` -> `https://example.com`.
fn origin_url(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or(""), port),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
    }
}
