use std::collections::HashMap;

/// Parsed robots.txt rules, grouped by user-agent token.
///
/// Follows the common interpretation of the de-facto standard: rule groups
/// apply to the most specific matching agent token, the longest matching
/// path pattern wins, and an Allow beats a Disallow of the same length.
/// Unknown directives are ignored.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    groups: HashMap<String, Vec<Rule>>,
    /// `Sitemap:` directives, in file order. These are global, not tied
    /// to any agent group.
    sitemaps: Vec<String>,
}

#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    pattern: String,
}

impl RobotsTxt {
    pub fn parse(content: &str) -> Self {
        let mut groups: HashMap<String, Vec<Rule>> = HashMap::new();
        let mut sitemaps: Vec<String> = Vec::new();
        let mut current_agents: Vec<String> = Vec::new();
        let mut seen_rule_for_group = false;

        for line in content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group.
                    if seen_rule_for_group {
                        current_agents.clear();
                        seen_rule_for_group = false;
                    }
                    current_agents.push(value.to_lowercase());
                    groups.entry(value.to_lowercase()).or_default();
                }
                "allow" | "disallow" => {
                    seen_rule_for_group = true;
                    // An empty Disallow means "allow everything" and needs
                    // no rule at all.
                    if value.is_empty() {
                        continue;
                    }
                    for agent in &current_agents {
                        groups.entry(agent.clone()).or_default().push(Rule {
                            allow: key == "allow",
                            pattern: value.to_string(),
                        });
                    }
                }
                "sitemap" => {
                    if !value.is_empty() {
                        sitemaps.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        Self { groups, sitemaps }
    }

    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Whether `user_agent` may fetch `path`. Paths not covered by any rule
    /// are allowed.
    pub fn allows(&self, user_agent: &str, path: &str) -> bool {
        let agent = user_agent.to_lowercase();
        // Most specific group wins: longest matching agent token first.
        let rules = self
            .groups
            .iter()
            .filter(|(token, _)| token.as_str() != "*" && agent.contains(token.as_str()))
            .max_by_key(|(token, _)| token.len())
            .map(|(_, rules)| rules)
            .or_else(|| self.groups.get("*"));

        let Some(rules) = rules else {
            return true;
        };

        let mut verdict = true;
        let mut best_len = 0usize;
        for rule in rules {
            if pattern_matches(&rule.pattern, path) {
                let len = rule.pattern.len();
                if len > best_len || (len == best_len && rule.allow) {
                    best_len = len;
                    verdict = rule.allow;
                }
            }
        }
        verdict
    }
}

/// Anchored-prefix match with `*` wildcards and an optional `$` end anchor.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, must_end) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let mut pieces = pattern.split('*');
    let Some(first) = pieces.next() else {
        return true;
    };
    if !path.starts_with(first) {
        return false;
    }

    let mut pos = first.len();
    for piece in pieces {
        if piece.is_empty() {
            pos = path.len();
            continue;
        }
        match path[pos..].find(piece) {
            Some(offset) => pos = pos + offset + piece.len(),
            None => return false,
        }
    }

    !must_end || pos == path.len() || pattern.ends_with('*')
}
