use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Global ceiling across all workers, not per worker.
    pub rate_limit_per_minute: usize,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Total page fetches per site, the root page included.
    pub max_pages: usize,
    /// Pause between fetches against the same host.
    pub request_delay_ms: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub workers: usize,
    pub scan_emails: bool,
    /// Extra category suffixes tried when the base query runs dry.
    pub search_variations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    /// Adds Address and SourceId columns to the review batch.
    pub include_diagnostics: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeConfig {
    pub backup_directory: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 600,
            timeout_seconds: 12,
            max_attempts: 3,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            request_delay_ms: 750,
            timeout_seconds: 12,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            scan_emails: true,
            search_variations: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "out".to_string(),
            include_diagnostics: false,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            backup_directory: "backups".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.search.rate_limit_per_minute == 0 {
            return Err(Error::Config(
                "search.rate_limit_per_minute must be at least 1".to_string(),
            ));
        }
        if self.collection.workers == 0 {
            return Err(Error::Config(
                "collection.workers must be at least 1".to_string(),
            ));
        }
        if self.scraper.max_pages == 0 {
            return Err(Error::Config(
                "scraper.max_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub async fn load_config(path: &str) -> Result<Config> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
