//! Contact scraping against candidate business websites. The scraper honours
//! each host's robots.txt before fetching anything beyond the policy file, and
//! paces its own requests; the search-service rate limiter is deliberately not
//! involved here.

pub mod emails;
pub mod robots;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::ScraperConfig;
use robots::RobotsRules;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; lead-harvester/0.1)";

// Well-known contact locations, preferred order. Spanish variants first since
// that is where most of the target sites live.
const CANDIDATE_PATHS: &[&str] = &[
    "/contacto",
    "/contact",
    "/contact-us",
    "/contactenos",
    "/contactar",
    "/nosotros",
    "/about",
    "/quienes-somos",
    "/acerca",
    "/ubicacion",
    "/location",
    "/reservas",
    "/bookings",
    "/politica-de-privacidad",
    "/privacy-policy",
];

const LINK_INDICATORS: &[&str] = &["contact", "contacto", "about", "nosotros", "equipo", "team"];

/// Boundary for substituting alternate contact-extraction backends.
#[async_trait]
pub trait ContactExtractor: Send + Sync {
    /// Candidate emails for a business website, already validated and
    /// deduplicated. Failures are swallowed into an empty result; a
    /// crawl-permission denial is a hard skip, not an error.
    async fn extract_contacts(&self, website_url: &str, max_pages: usize) -> Vec<String>;
}

pub struct EmailScraper {
    client: reqwest::Client,
    request_delay: Duration,
}

impl EmailScraper {
    pub fn new(config: &ScraperConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    debug!("failed to read body of {}: {}", url, e);
                    None
                }
            },
            Ok(response) => {
                debug!("skipping {}: HTTP {}", url, response.status());
                None
            }
            Err(e) => {
                debug!("fetch failed for {}: {}", url, e);
                None
            }
        }
    }

    async fn robots_for(&self, base: &Url) -> RobotsRules {
        // join keeps the port, unlike rebuilding from scheme+host.
        let Ok(robots_url) = base.join("/robots.txt") else {
            return RobotsRules::allow_all();
        };
        match self.fetch_page(robots_url.as_str()).await {
            Some(content) => RobotsRules::parse(&content, USER_AGENT),
            // An unreachable policy does not forbid crawling.
            None => RobotsRules::allow_all(),
        }
    }
}

#[async_trait]
impl ContactExtractor for EmailScraper {
    async fn extract_contacts(&self, website_url: &str, max_pages: usize) -> Vec<String> {
        let Some(base) = normalize_url(website_url) else {
            return Vec::new();
        };
        let host = base.host_str().unwrap_or("").to_string();

        let rules = self.robots_for(&base).await;
        let root_path = if base.path().is_empty() { "/" } else { base.path() };
        if !rules.allows(root_path) {
            debug!("robots.txt disallows scraping {}", host);
            return Vec::new();
        }

        let mut found = BTreeSet::new();
        let mut fetched = 0usize;

        let root_html = self.fetch_page(base.as_str()).await;
        fetched += 1;
        let mut candidates: Vec<Url> = Vec::new();
        if let Some(html) = &root_html {
            found.extend(emails::harvest(html));
            for email in mailto_addresses(html) {
                if emails::is_valid_candidate(&email) {
                    found.insert(email.to_lowercase());
                }
            }
            candidates = discover_links(html, &base);
        }
        for path in CANDIDATE_PATHS {
            if let Ok(url) = base.join(path) {
                candidates.push(url);
            }
        }

        let mut visited = BTreeSet::new();
        visited.insert(base.as_str().to_string());
        for url in candidates {
            if fetched >= max_pages {
                break;
            }
            if !visited.insert(url.as_str().to_string()) {
                continue;
            }
            if !rules.allows(url.path()) {
                continue;
            }
            tokio::time::sleep(self.request_delay).await;
            if let Some(html) = self.fetch_page(url.as_str()).await {
                found.extend(emails::harvest(&html));
            }
            fetched += 1;
        }

        let result = emails::prefer_same_domain(found, &host);
        if !result.is_empty() {
            debug!("found {} email(s) on {}", result.len(), host);
        }
        result
    }
}

/// Adds a scheme when missing and drops fragments. Returns `None` for input
/// that cannot become an absolute URL.
pub fn normalize_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("n/a") {
        return None;
    }
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let mut url = Url::parse(&with_scheme).ok()?;
    url.set_fragment(None);
    url.host_str()?;
    Some(url)
}

// Sync helpers keep `scraper::Html` (not Send) out of any await span.

fn discover_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").unwrap();
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href_lower = href.to_lowercase();
        if !LINK_INDICATORS.iter().any(|w| href_lower.contains(w)) {
            continue;
        }
        if let Ok(url) = base.join(href) {
            if url.host_str() == base.host_str() {
                links.push(url);
            }
        }
    }
    links.truncate(10);
    links
}

fn mailto_addresses(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"a[href^="mailto:"]"#).unwrap();
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| href.strip_prefix("mailto:"))
        .map(|rest| rest.split('?').next().unwrap_or("").trim().to_string())
        .filter(|email| !email.is_empty())
        .collect()
}
