use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use lead_harvester::collect::{CollectOptions, CollectionOrchestrator};
use lead_harvester::error::{Error, Result};
use lead_harvester::models::BusinessLead;
use lead_harvester::scrape::ContactExtractor;
use lead_harvester::search::SearchProvider;

fn lead(name: &str, phone: Option<&str>, website: Option<&str>, source_id: Option<&str>) -> BusinessLead {
    BusinessLead {
        name: name.to_string(),
        address: format!("{name} HQ"),
        city: "Bogotá".to_string(),
        phone: phone.map(str::to_string),
        website: website.map(str::to_string),
        source_id: source_id.map(str::to_string),
    }
}

/// Canned search results; `details` either fills the missing phone or fails.
struct CannedSearch {
    leads: Vec<BusinessLead>,
    details_phone: Option<String>,
    details_calls: AtomicUsize,
}

#[async_trait]
impl SearchProvider for CannedSearch {
    async fn search(&self, _city: &str, _category: &str, _limit: usize) -> Result<Vec<BusinessLead>> {
        Ok(self.leads.clone())
    }

    async fn details(&self, source_id: &str) -> Result<BusinessLead> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        match &self.details_phone {
            Some(phone) => Ok(BusinessLead {
                phone: Some(phone.clone()),
                ..lead("detailed", None, None, Some(source_id))
            }),
            None => Err(Error::TransientUpstream("details unavailable".to_string())),
        }
    }
}

struct CountingExtractor {
    calls: AtomicUsize,
}

#[async_trait]
impl ContactExtractor for CountingExtractor {
    async fn extract_contacts(&self, website_url: &str, _max_pages: usize) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        vec![format!("info@{}", website_url.trim_start_matches("https://"))]
    }
}

fn opts(target: usize, workers: usize, scan_emails: bool) -> CollectOptions {
    CollectOptions {
        city: "Bogotá".to_string(),
        category: "hoteles".to_string(),
        target_count: target,
        workers,
        scan_emails,
        max_pages: 3,
        variations: Vec::new(),
    }
}

fn no_stop() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[tokio::test]
async fn records_come_back_in_discovery_order_regardless_of_worker_count() {
    let leads = vec![
        lead("Acme", Some("3001234567"), Some("https://acme.com"), None),
        lead("Hotel Sol", Some("6012345678"), None, None),
        lead("Café Luna", Some("3109876543"), None, None),
        lead("Globex", Some("6017654321"), None, None),
    ];

    let mut runs = Vec::new();
    for workers in [1usize, 4] {
        let search = Arc::new(CannedSearch {
            leads: leads.clone(),
            details_phone: None,
            details_calls: AtomicUsize::new(0),
        });
        let extractor = Arc::new(CountingExtractor {
            calls: AtomicUsize::new(0),
        });
        let orchestrator = CollectionOrchestrator::new(search, extractor);
        let records = orchestrator
            .collect(&opts(4, workers, true), no_stop())
            .await
            .unwrap();
        runs.push(records.iter().map(|r| r.name.clone()).collect::<Vec<_>>());
    }

    assert_eq!(runs[0], vec!["Acme", "Hotel Sol", "Café Luna", "Globex"]);
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn mobiles_and_landlines_land_in_their_own_columns() {
    let search = Arc::new(CannedSearch {
        leads: vec![
            lead("Acme", Some("+57 300 123 4567"), None, None),
            lead("Hotel Sol", Some("6012345678"), None, None),
        ],
        details_phone: None,
        details_calls: AtomicUsize::new(0),
    });
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(search, extractor);

    let records = orchestrator
        .collect(&opts(2, 2, false), no_stop())
        .await
        .unwrap();

    assert_eq!(records[0].whatsapp, "3001234567");
    assert_eq!(records[0].phone, "");
    assert_eq!(records[1].whatsapp, "");
    assert_eq!(records[1].phone, "6012345678");
    assert!(records.iter().all(|r| r.verified));
}

#[tokio::test]
async fn failed_details_fetch_degrades_to_an_unverified_record() {
    let search = Arc::new(CannedSearch {
        leads: vec![lead("Globex", None, None, Some("g-1"))],
        details_phone: None,
        details_calls: AtomicUsize::new(0),
    });
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(search.clone(), extractor);

    let records = orchestrator
        .collect(&opts(1, 1, true), no_stop())
        .await
        .unwrap();

    assert_eq!(search.details_calls.load(Ordering::SeqCst), 1);
    assert_eq!(records.len(), 1);
    assert!(!records[0].verified);
    assert_eq!(records[0].whatsapp, "");
    assert_eq!(records[0].phone, "");
    assert!(records[0].email.is_none());
}

#[tokio::test]
async fn details_fill_in_a_missing_phone() {
    let search = Arc::new(CannedSearch {
        leads: vec![lead("Globex", None, Some("https://globex.co"), Some("g-1"))],
        details_phone: Some("3115550000".to_string()),
        details_calls: AtomicUsize::new(0),
    });
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(search, extractor);

    let records = orchestrator
        .collect(&opts(1, 1, false), no_stop())
        .await
        .unwrap();

    assert_eq!(records[0].whatsapp, "3115550000");
    assert!(records[0].verified);
}

#[tokio::test]
async fn scraper_is_only_consulted_for_real_websites() {
    let search = Arc::new(CannedSearch {
        leads: vec![
            lead("Acme", Some("3001234567"), Some("https://acme.com"), None),
            lead("Hotel Sol", Some("6012345678"), None, None),
            lead("Café Luna", Some("3109876543"), Some("https://wa.me/573001234567"), None),
        ],
        details_phone: None,
        details_calls: AtomicUsize::new(0),
    });
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(search, extractor.clone());

    let records = orchestrator
        .collect(&opts(3, 2, true), no_stop())
        .await
        .unwrap();

    // Only the lead with a usable website triggers a scan. Messaging links
    // are dropped from the record entirely.
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(records[0].email.as_deref(), Some("info@acme.com"));
    assert_eq!(records[2].website, "");
}

#[tokio::test]
async fn email_scanning_can_be_switched_off() {
    let search = Arc::new(CannedSearch {
        leads: vec![lead("Acme", Some("3001234567"), Some("https://acme.com"), None)],
        details_phone: None,
        details_calls: AtomicUsize::new(0),
    });
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(search, extractor.clone());

    let records = orchestrator
        .collect(&opts(1, 1, false), no_stop())
        .await
        .unwrap();

    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    assert!(records[0].email.is_none());
}

#[tokio::test]
async fn repeated_search_hits_are_collapsed_and_target_is_respected() {
    let search = Arc::new(CannedSearch {
        leads: vec![
            lead("Acme", Some("3001234567"), Some("https://acme.com"), None),
            lead("ACME", Some("3001234567"), Some("http://www.acme.com"), None),
            lead("Hotel Sol", Some("6012345678"), None, None),
            lead("Café Luna", Some("3109876543"), None, None),
        ],
        details_phone: None,
        details_calls: AtomicUsize::new(0),
    });
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(search, extractor);

    let records = orchestrator
        .collect(&opts(2, 2, false), no_stop())
        .await
        .unwrap();

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Acme", "Hotel Sol"]);
}

#[tokio::test]
async fn stop_flag_prevents_new_work() {
    let search = Arc::new(CannedSearch {
        leads: vec![lead("Acme", Some("3001234567"), None, None)],
        details_phone: None,
        details_calls: AtomicUsize::new(0),
    });
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(search, extractor);

    let stop = Arc::new(AtomicBool::new(true));
    let records = orchestrator.collect(&opts(5, 2, true), stop).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn search_failure_with_nothing_gathered_fails_the_run() {
    struct FailingSearch;

    #[async_trait]
    impl SearchProvider for FailingSearch {
        async fn search(&self, _: &str, _: &str, _: usize) -> Result<Vec<BusinessLead>> {
            Err(Error::UpstreamRateLimited)
        }
        async fn details(&self, _: &str) -> Result<BusinessLead> {
            Err(Error::UpstreamRateLimited)
        }
    }

    let orchestrator = CollectionOrchestrator::new(
        Arc::new(FailingSearch),
        Arc::new(CountingExtractor {
            calls: AtomicUsize::new(0),
        }),
    );
    let result = orchestrator.collect(&opts(3, 2, false), no_stop()).await;
    assert!(matches!(result, Err(Error::UpstreamRateLimited)));
}
