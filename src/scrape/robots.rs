//! Minimal robots.txt evaluation for the contact scraper. Supports user-agent
//! groups, Allow/Disallow with longest-prefix precedence, and `*` patterns
//! truncated at the first wildcard. An unreachable or empty policy allows
//! everything.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Allow,
    Disallow,
}

#[derive(Debug, Clone)]
struct Rule {
    kind: RuleKind,
    prefix: String,
}

#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    rules: Vec<Rule>,
}

impl RobotsRules {
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses the rules that apply to `user_agent`: the group(s) naming the
    /// agent when any exist, the `*` group(s) otherwise.
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let agent_lower = user_agent.to_lowercase();
        let mut specific = Vec::new();
        let mut wildcard = Vec::new();

        // Group state: consecutive User-agent lines share the rules below them.
        let mut group_specific = false;
        let mut group_wildcard = false;
        let mut in_agent_lines = false;

        for raw_line in content.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group_specific = false;
                        group_wildcard = false;
                        in_agent_lines = true;
                    }
                    if value == "*" {
                        group_wildcard = true;
                    } else if agent_lower.contains(&value.to_lowercase()) {
                        group_specific = true;
                    }
                }
                "allow" | "disallow" => {
                    in_agent_lines = false;
                    if value.is_empty() {
                        // "Disallow:" with no path permits everything.
                        continue;
                    }
                    let kind = if field == "allow" {
                        RuleKind::Allow
                    } else {
                        RuleKind::Disallow
                    };
                    let prefix = value.split('*').next().unwrap_or("").to_string();
                    let rule = Rule { kind, prefix };
                    if group_specific {
                        specific.push(rule.clone());
                    }
                    if group_wildcard {
                        wildcard.push(rule);
                    }
                }
                _ => {
                    in_agent_lines = false;
                }
            }
        }

        let rules = if specific.is_empty() { wildcard } else { specific };
        Self { rules }
    }

    /// Longest matching prefix decides; ties go to Allow; no match means
    /// allowed.
    pub fn allows(&self, path: &str) -> bool {
        let path = if path.is_empty() { "/" } else { path };
        let mut best: Option<(&Rule, usize)> = None;
        for rule in &self.rules {
            if !path.starts_with(rule.prefix.as_str()) {
                continue;
            }
            let len = rule.prefix.len();
            match best {
                Some((current, best_len)) => {
                    if len > best_len
                        || (len == best_len
                            && rule.kind == RuleKind::Allow
                            && current.kind == RuleKind::Disallow)
                    {
                        best = Some((rule, len));
                    }
                }
                None => best = Some((rule, len)),
            }
        }
        match best {
            Some((rule, _)) => rule.kind == RuleKind::Allow,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "lead-harvester";

    #[test]
    fn empty_policy_allows_everything() {
        assert!(RobotsRules::allow_all().allows("/"));
        assert!(RobotsRules::parse("", AGENT).allows("/contact"));
    }

    #[test]
    fn blanket_disallow_blocks_the_root() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /\n", AGENT);
        assert!(!rules.allows("/"));
        assert!(!rules.allows("/contact"));
    }

    #[test]
    fn longest_prefix_wins_and_allow_beats_disallow_on_tie() {
        let content = "User-agent: *\nDisallow: /private\nAllow: /private/ok\n";
        let rules = RobotsRules::parse(content, AGENT);
        assert!(rules.allows("/"));
        assert!(!rules.allows("/private/secret"));
        assert!(rules.allows("/private/ok/page"));
    }

    #[test]
    fn specific_group_overrides_wildcard() {
        let content = "User-agent: *\nDisallow: /\n\nUser-agent: lead-harvester\nDisallow: /admin\n";
        let rules = RobotsRules::parse(content, AGENT);
        assert!(rules.allows("/contact"));
        assert!(!rules.allows("/admin"));
    }

    #[test]
    fn empty_disallow_and_comments_are_ignored() {
        let content = "# policy\nUser-agent: *\nDisallow:\n";
        let rules = RobotsRules::parse(content, AGENT);
        assert!(rules.allows("/anything"));
    }

    #[test]
    fn wildcard_patterns_match_on_their_prefix() {
        let content = "User-agent: *\nDisallow: /search*\n";
        let rules = RobotsRules::parse(content, AGENT);
        assert!(!rules.allows("/search?q=x"));
        assert!(rules.allows("/sea"));
    }
}
