use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lead_harvester::collect::{CollectOptions, CollectionOrchestrator};
use lead_harvester::config::{load_config, Config};
use lead_harvester::dataset::{read_batch, write_batch};
use lead_harvester::error::{Error, Result};
use lead_harvester::merge::MergeEngine;
use lead_harvester::rate_limit::RateLimiter;
use lead_harvester::scrape::EmailScraper;
use lead_harvester::search::PlacesClient;

const USAGE: &str = "usage:\n  lead-harvester collect <city> <category> <count>\n  lead-harvester merge <batch.csv> <master.csv>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.yml: {e}. Using defaults.");
            Config::default()
        }
    };

    let default_filter = format!("lead_harvester={},hyper=warn,reqwest=warn", config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("collect") => {
            let (city, category, count) = match (args.get(1), args.get(2), args.get(3)) {
                (Some(city), Some(category), Some(count)) => {
                    let count: usize = count
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid count: {count}")))?;
                    (city.clone(), category.clone(), count)
                }
                _ => return Err(Error::Config(USAGE.to_string())),
            };
            run_collection(&config, city, category, count).await
        }
        Some("merge") => {
            let (batch, master) = match (args.get(1), args.get(2)) {
                (Some(batch), Some(master)) => (PathBuf::from(batch), PathBuf::from(master)),
                _ => return Err(Error::Config(USAGE.to_string())),
            };
            run_merge(&config, &batch, &master)
        }
        _ => Err(Error::Config(USAGE.to_string())),
    }
}

async fn run_collection(
    config: &Config,
    city: String,
    category: String,
    count: usize,
) -> Result<()> {
    let limiter = Arc::new(RateLimiter::new(config.search.rate_limit_per_minute)?);
    let search = Arc::new(PlacesClient::from_env(limiter, &config.search)?);
    let extractor = Arc::new(EmailScraper::new(&config.scraper));
    let orchestrator = CollectionOrchestrator::new(search, extractor);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("stop requested; workers will finish their current lead");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let opts = CollectOptions {
        city: city.clone(),
        category: category.clone(),
        target_count: count,
        workers: config.collection.workers,
        scan_emails: config.collection.scan_emails,
        max_pages: config.scraper.max_pages,
        variations: config.collection.search_variations.clone(),
    };
    let records = orchestrator.collect(&opts, stop).await?;

    tokio::fs::create_dir_all(&config.output.directory).await?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let slug = |s: &str| s.to_lowercase().replace(char::is_whitespace, "_");
    let path = Path::new(&config.output.directory).join(format!(
        "batch_{}_{}_{stamp}.csv",
        slug(&city),
        slug(&category)
    ));
    write_batch(&path, &records, config.output.include_diagnostics)?;
    info!("review the batch, then run: lead-harvester merge {} <master.csv>", path.display());
    Ok(())
}

fn run_merge(config: &Config, batch_path: &Path, master_path: &Path) -> Result<()> {
    let batch = read_batch(batch_path)?;
    if batch.is_empty() {
        warn!("batch {} holds no records, nothing to merge", batch_path.display());
        return Ok(());
    }
    let engine = MergeEngine::new(&config.merge.backup_directory);
    let report = engine.merge(&batch, master_path)?;
    info!(
        "merged {}: {} added, {} updated, {} skipped (backup: {})",
        master_path.display(),
        report.added,
        report.updated,
        report.skipped,
        report.backup.path.display()
    );
    Ok(())
}
