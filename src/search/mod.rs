//! Client for the external place-search service. Every request passes through
//! the shared [`RateLimiter`] first; transient failures are retried with
//! exponential backoff, permanent ones surface immediately and stay scoped to
//! the lead being fetched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::models::BusinessLead;
use crate::rate_limit::RateLimiter;

/// Boundary for substituting alternate search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Pages the upstream text search until `limit` leads or exhaustion.
    async fn search(&self, city: &str, category: &str, limit: usize) -> Result<Vec<BusinessLead>>;

    /// Fetches full contact fields for one lead reference.
    async fn details(&self, source_id: &str) -> Result<BusinessLead>;
}

pub const API_KEY_ENV: &str = "PLACES_API_KEY";

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
// The upstream needs a moment before a next-page token becomes valid.
const PAGE_TOKEN_DELAY: Duration = Duration::from_secs(2);
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(5);

const DETAILS_FIELDS: &str =
    "place_id,name,formatted_phone_number,international_phone_number,website,formatted_address";

pub struct PlacesClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter>,
    max_attempts: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceStub>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    result: Option<PlaceStub>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceStub {
    #[serde(default)]
    place_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    formatted_phone_number: Option<String>,
    #[serde(default)]
    international_phone_number: Option<String>,
    #[serde(default)]
    website: Option<String>,
}

impl PlacesClient {
    /// Reads the API credential from the environment; its absence is a
    /// configuration error raised before any request is issued.
    pub fn from_env(limiter: Arc<RateLimiter>, config: &SearchConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{API_KEY_ENV} not set in the environment")))?;
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!("{API_KEY_ENV} is empty")));
        }
        Ok(Self::new(api_key, DEFAULT_BASE_URL, limiter, config))
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        limiter: Arc<RateLimiter>,
        config: &SearchConfig,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            limiter,
            max_attempts: config.max_attempts.max(1),
        }
    }

    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire().await;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    if matches!(e, Error::UpstreamRateLimited) {
                        sleep(RATE_LIMIT_COOLDOWN).await;
                    }
                    let backoff = Duration::from_millis(
                        (1000u64 << (attempt - 1)).min(8000) + fastrand::u64(0..250),
                    );
                    warn!(
                        "transient upstream failure (attempt {}/{}): {}; retrying in {:?}",
                        attempt, self.max_attempts, e, backoff
                    );
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::TransientUpstream(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::UpstreamRateLimited);
        }
        if status.is_server_error() {
            return Err(Error::TransientUpstream(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(Error::PermanentUpstream(format!("HTTP {status}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::PermanentUpstream(format!("malformed response: {e}")))
    }

    async fn search_page(&self, query: &str, page_token: Option<&str>) -> Result<SearchResponse> {
        let url = format!("{}/textsearch/json", self.base_url);
        let url: &str = &url;
        self.with_retry(move || async move {
            let mut params = vec![("query", query), ("key", self.api_key.as_str())];
            if let Some(token) = page_token {
                params.push(("pagetoken", token));
            }
            let response: SearchResponse = self.get_json(url, &params).await?;
            ensure_ok_status(&response.status, response.error_message.as_deref())?;
            Ok(response)
        })
        .await
    }
}

#[async_trait]
impl SearchProvider for PlacesClient {
    async fn search(&self, city: &str, category: &str, limit: usize) -> Result<Vec<BusinessLead>> {
        let query = format!("{category} in {city}");
        debug!("searching: {} (limit {})", query, limit);

        let mut leads = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            if page_token.is_some() {
                sleep(PAGE_TOKEN_DELAY).await;
            }
            let page = self.search_page(&query, page_token.as_deref()).await?;
            leads.extend(page.results.into_iter().map(|stub| stub.into_lead(city)));
            page_token = page.next_page_token;
            if page_token.is_none() || leads.len() >= limit {
                break;
            }
        }
        leads.truncate(limit);
        debug!("search '{}' yielded {} lead(s)", query, leads.len());
        Ok(leads)
    }

    async fn details(&self, source_id: &str) -> Result<BusinessLead> {
        let url = format!("{}/details/json", self.base_url);
        let url: &str = &url;
        let response: DetailsResponse = self
            .with_retry(move || async move {
                let params = [
                    ("key", self.api_key.as_str()),
                    ("place_id", source_id),
                    ("fields", DETAILS_FIELDS),
                ];
                let response: DetailsResponse = self.get_json(url, &params).await?;
                ensure_ok_status(&response.status, response.error_message.as_deref())?;
                Ok(response)
            })
            .await?;

        match response.result {
            Some(stub) => Ok(stub.into_lead("")),
            None => Err(Error::PermanentUpstream(format!(
                "details for {source_id} came back empty"
            ))),
        }
    }
}

/// Maps the upstream's body-level status. `ZERO_RESULTS` is a successful empty
/// page, a rate-limit signal is transient, everything else unexpected is
/// permanent.
fn ensure_ok_status(status: &str, error_message: Option<&str>) -> Result<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "OVER_QUERY_LIMIT" | "RESOURCE_EXHAUSTED" => Err(Error::UpstreamRateLimited),
        other => Err(Error::PermanentUpstream(format!(
            "{other}: {}",
            error_message.unwrap_or("no detail")
        ))),
    }
}

impl PlaceStub {
    fn into_lead(self, city: &str) -> BusinessLead {
        let phone = self
            .formatted_phone_number
            .or(self.international_phone_number)
            .filter(|p| !p.trim().is_empty());
        BusinessLead {
            name: self.name.unwrap_or_default().trim().to_string(),
            address: self.formatted_address.unwrap_or_default(),
            city: city.to_string(),
            phone,
            website: self.website.filter(|w| !w.trim().is_empty()),
            source_id: self.place_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_status_classification() {
        assert!(ensure_ok_status("OK", None).is_ok());
        assert!(ensure_ok_status("ZERO_RESULTS", None).is_ok());
        assert!(matches!(
            ensure_ok_status("OVER_QUERY_LIMIT", None),
            Err(Error::UpstreamRateLimited)
        ));
        assert!(matches!(
            ensure_ok_status("REQUEST_DENIED", Some("bad key")),
            Err(Error::PermanentUpstream(_))
        ));
        assert!(matches!(
            ensure_ok_status("INVALID_REQUEST", None),
            Err(Error::PermanentUpstream(_))
        ));
    }

    #[test]
    fn search_response_parses_upstream_shape() {
        let body = r#"{
            "status": "OK",
            "results": [{
                "place_id": "abc123",
                "name": "Hotel Sol",
                "formatted_address": "Calle 1 # 2-3, Bogotá",
                "formatted_phone_number": "300 123 4567",
                "website": "https://hotelsol.com"
            }],
            "next_page_token": "tok"
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "OK");
        assert_eq!(parsed.next_page_token.as_deref(), Some("tok"));

        let lead = parsed
            .results
            .into_iter()
            .next()
            .unwrap()
            .into_lead("Bogotá");
        assert_eq!(lead.name, "Hotel Sol");
        assert_eq!(lead.city, "Bogotá");
        assert_eq!(lead.phone.as_deref(), Some("300 123 4567"));
        assert_eq!(lead.source_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn blank_fields_become_none() {
        let stub = PlaceStub {
            name: Some("  Acme ".to_string()),
            formatted_phone_number: Some("  ".to_string()),
            website: Some("".to_string()),
            ..PlaceStub::default()
        };
        let lead = stub.into_lead("Cali");
        assert_eq!(lead.name, "Acme");
        assert!(lead.phone.is_none());
        assert!(lead.website.is_none());
    }
}
