//! Email harvesting and validation helpers.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9_.+%-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
    })
}

const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "localhost",
    "test.com",
    "demo.com",
    "email.com",
    "domain.com",
];

const GENERIC_MAILBOXES: &[&str] = &["noreply", "no-reply", "donotreply", "mailer-daemon"];

// The pattern also matches asset names like sprite@2x.png embedded in markup.
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".css", ".js"];

/// All syntactically valid, non-placeholder addresses found in a page.
/// A `BTreeSet` keeps extraction order-independent and deterministic.
pub fn harvest(html: &str) -> BTreeSet<String> {
    email_regex()
        .find_iter(html)
        .map(|m| m.as_str().to_lowercase())
        .filter(|e| is_valid_candidate(e))
        .collect()
}

pub fn is_valid_candidate(email: &str) -> bool {
    let email = email.trim().to_lowercase();
    if !email_regex().is_match(&email) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if PLACEHOLDER_DOMAINS.contains(&domain) {
        return false;
    }
    if ASSET_SUFFIXES.iter().any(|s| domain.ends_with(s)) {
        return false;
    }
    if GENERIC_MAILBOXES.iter().any(|m| local.starts_with(m)) {
        return false;
    }
    true
}

/// Approximation of the registrable domain: the last two labels, or three when
/// the host uses a two-part country suffix (`acme.com.co`, `acme.co.uk`).
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_start_matches("www.").to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return host;
    }
    let second_level = labels[labels.len() - 2];
    let take = if labels.len() >= 3
        && labels[labels.len() - 1].len() == 2
        && matches!(second_level, "com" | "co" | "org" | "net" | "edu" | "gov")
    {
        3
    } else {
        2
    };
    labels[labels.len() - take..].join(".")
}

/// Prefers addresses hosted on the site's own domain; third-party addresses
/// (booking widgets, embedded chat) survive only when nothing local was found.
pub fn prefer_same_domain(emails: BTreeSet<String>, site_host: &str) -> Vec<String> {
    let site_domain = registrable_domain(site_host);
    let own: Vec<String> = emails
        .iter()
        .filter(|e| {
            e.split_once('@')
                .map(|(_, d)| registrable_domain(d) == site_domain)
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    if own.is_empty() {
        emails.into_iter().collect()
    } else {
        own
    }
}
