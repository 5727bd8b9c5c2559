//! Collection run: search for leads, fan enrichment out across a bounded pool
//! of workers, assemble review-ready contact records. A run always completes
//! with a full batch; per-lead trouble degrades that one record to unverified.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dedup::{normalize_host, normalize_key};
use crate::error::{Error, Result};
use crate::models::{BusinessLead, ContactRecord};
use crate::phone::{classify, PhoneClass};
use crate::scrape::ContactExtractor;
use crate::search::SearchProvider;

const MAX_SEARCH_ATTEMPTS: usize = 5;
const MIN_SEARCH_CHUNK: usize = 60;

// Messaging links, social profiles and shorteners are not business websites.
const EXCLUDED_WEBSITE_HOSTS: &[&str] = &[
    "wa.me",
    "wa.link",
    "whatsapp.com",
    "web.whatsapp.com",
    "instagram.com",
    "facebook.com",
    "twitter.com",
    "tiktok.com",
    "linkedin.com",
    "youtube.com",
    "maps.google.com",
    "goo.gl",
    "bit.ly",
    "tinyurl.com",
    "t.co",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Searching,
    Enriching,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub city: String,
    pub category: String,
    pub target_count: usize,
    pub workers: usize,
    pub scan_emails: bool,
    pub max_pages: usize,
    /// Category suffixes tried in order when the base query runs dry.
    pub variations: Vec<String>,
}

pub struct CollectionOrchestrator {
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn ContactExtractor>,
}

impl CollectionOrchestrator {
    pub fn new(search: Arc<dyn SearchProvider>, extractor: Arc<dyn ContactExtractor>) -> Self {
        Self { search, extractor }
    }

    /// Runs a full collection. The returned batch holds verified and
    /// unverified records alike, in a deterministic order (discovery order of
    /// the underlying leads), and is never written to the master dataset here.
    pub async fn collect(
        &self,
        opts: &CollectOptions,
        stop: Arc<AtomicBool>,
    ) -> Result<Vec<ContactRecord>> {
        if opts.workers == 0 {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }
        if opts.target_count == 0 {
            return Err(Error::Config("target count must be at least 1".to_string()));
        }

        info!(
            "collection run: {} '{}' in {} ({} workers), state {:?}",
            opts.target_count,
            opts.category,
            opts.city,
            opts.workers,
            RunState::Searching
        );

        let leads = match self.gather_leads(opts, &stop).await {
            Ok(leads) => leads,
            Err(e) => {
                warn!("collection run {:?} during search: {}", RunState::Failed, e);
                return Err(e);
            }
        };
        info!(
            "search phase done: {} distinct lead(s), state {:?}",
            leads.len(),
            RunState::Enriching
        );

        let queue: Arc<Mutex<VecDeque<(usize, BusinessLead)>>> =
            Arc::new(Mutex::new(leads.into_iter().enumerate().collect()));
        let results: Arc<Mutex<Vec<(usize, ContactRecord)>>> = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(opts.workers);
        for worker in 0..opts.workers {
            let queue = queue.clone();
            let results = results.clone();
            let stop = stop.clone();
            let search = self.search.clone();
            let extractor = self.extractor.clone();
            let opts = opts.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    if stop.load(Ordering::Relaxed) {
                        debug!("worker {worker}: stop requested, not picking up more leads");
                        break;
                    }
                    let next = queue.lock().await.pop_front();
                    let Some((index, lead)) = next else {
                        break;
                    };
                    let record =
                        enrich_lead(search.as_ref(), extractor.as_ref(), lead, &opts).await;
                    results.lock().await.push((index, record));
                }
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("enrichment worker panicked: {e}");
            }
        }

        let mut indexed = {
            let mut guard = results.lock().await;
            std::mem::take(&mut *guard)
        };
        indexed.sort_by_key(|(index, _)| *index);
        let records: Vec<ContactRecord> = indexed.into_iter().map(|(_, r)| r).collect();

        let verified = records.iter().filter(|r| r.verified).count();
        info!(
            "collection run {:?}: {} record(s), {} verified",
            RunState::Completed,
            records.len(),
            verified
        );
        Ok(records)
    }

    /// Search phase: queries the provider across the base category and its
    /// variations until enough distinct leads (name+website key) are gathered
    /// or the source is exhausted.
    async fn gather_leads(
        &self,
        opts: &CollectOptions,
        stop: &AtomicBool,
    ) -> Result<Vec<BusinessLead>> {
        let mut queries = vec![opts.category.clone()];
        queries.extend(
            opts.variations
                .iter()
                .map(|v| format!("{} {}", opts.category, v)),
        );

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut leads = Vec::new();

        for (attempt, category) in queries.iter().take(MAX_SEARCH_ATTEMPTS).enumerate() {
            if leads.len() >= opts.target_count || stop.load(Ordering::Relaxed) {
                break;
            }
            let remaining = opts.target_count - leads.len();
            let chunk = (remaining * 3).max(MIN_SEARCH_CHUNK);

            match self.search.search(&opts.city, category, chunk).await {
                Ok(found) => {
                    let mut fresh = 0usize;
                    for lead in found {
                        if leads.len() >= opts.target_count {
                            break;
                        }
                        let key = (
                            normalize_key(&lead.name),
                            normalize_host(lead.website.as_deref().unwrap_or("")),
                        );
                        if key.0.is_empty() && key.1.is_empty() {
                            continue;
                        }
                        if seen.insert(key) {
                            leads.push(lead);
                            fresh += 1;
                        }
                    }
                    debug!(
                        "search attempt {}: '{}' added {} lead(s), {} total",
                        attempt + 1,
                        category,
                        fresh,
                        leads.len()
                    );
                }
                Err(e) if leads.is_empty() => return Err(e),
                Err(e) => {
                    // Leads in hand: degrade instead of failing the run.
                    warn!("search attempt {} failed, keeping what we have: {}", attempt + 1, e);
                    break;
                }
            }
        }
        Ok(leads)
    }
}

/// Enriches one lead into a ContactRecord. Every failure path degrades to an
/// unverified record; nothing here can fail the run.
async fn enrich_lead(
    search: &dyn SearchProvider,
    extractor: &dyn ContactExtractor,
    mut lead: BusinessLead,
    opts: &CollectOptions,
) -> ContactRecord {
    if lead.phone.is_none() || lead.website.is_none() {
        if let Some(source_id) = lead.source_id.clone() {
            match search.details(&source_id).await {
                Ok(details) => {
                    if lead.phone.is_none() {
                        lead.phone = details.phone;
                    }
                    if lead.website.is_none() {
                        lead.website = details.website;
                    }
                    if lead.address.is_empty() {
                        lead.address = details.address;
                    }
                }
                Err(e) => warn!("details fetch failed for '{}': {}", lead.name, e),
            }
        }
    }

    let website = lead
        .website
        .as_deref()
        .filter(|w| is_real_website(w))
        .unwrap_or("")
        .trim()
        .to_string();

    let email = if opts.scan_emails && !website.is_empty() {
        extractor
            .extract_contacts(&website, opts.max_pages)
            .await
            .into_iter()
            .next()
    } else {
        None
    };

    let (class, number) = classify(lead.phone.as_deref().unwrap_or(""));
    let (whatsapp, phone) = match class {
        PhoneClass::Mobile => (number, String::new()),
        PhoneClass::Landline => (String::new(), number),
        PhoneClass::Unknown => (String::new(), String::new()),
    };

    let city = if lead.city.trim().is_empty() {
        opts.city.clone()
    } else {
        lead.city.clone()
    };

    let record = ContactRecord {
        name: lead.name.trim().to_string(),
        whatsapp,
        phone,
        email,
        website,
        city,
        address: lead.address.trim().to_string(),
        source_id: lead.source_id,
        verified: false,
    };
    let verified = record.has_contact();
    ContactRecord { verified, ..record }
}

/// Filters out links that are not actual business websites.
fn is_real_website(url: &str) -> bool {
    let host = normalize_host(url);
    if host.is_empty() {
        return false;
    }
    !EXCLUDED_WEBSITE_HOSTS
        .iter()
        .any(|excluded| host == *excluded || host.ends_with(&format!(".{excluded}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messaging_and_social_links_are_not_websites() {
        assert!(!is_real_website("https://wa.me/573001234567"));
        assert!(!is_real_website("https://www.instagram.com/acme"));
        assert!(!is_real_website("http://bit.ly/abc"));
        assert!(!is_real_website(""));
        assert!(is_real_website("https://acme.com.co"));
    }
}
