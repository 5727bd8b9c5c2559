//! Collection-and-merge pipeline for business contact records: a rate-limited
//! place-search client, a robots-aware email scraper, a bounded worker pool
//! for enrichment, and a backup-first merge into a fixed-schema master
//! dataset.

pub mod backup;
pub mod collect;
pub mod config;
pub mod dataset;
pub mod dedup;
pub mod error;
pub mod merge;
pub mod models;
pub mod phone;
pub mod rate_limit;
pub mod scrape;
pub mod search;
