use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::db::Database;
use crate::digest::DEFAULT_LATENCY;

/// Runtime settings, read from the environment with CLI overrides on top.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub digest_delay: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let digest_delay = match lookup("JOBDIGEST_DIGEST_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse::<u64>()
                    .context("JOBDIGEST_DIGEST_DELAY_MS must be a whole number of milliseconds")?,
            ),
            None => DEFAULT_LATENCY,
        };

        Ok(Config {
            db_path: lookup("JOBDIGEST_DB")
                .map(PathBuf::from)
                .unwrap_or_else(Database::default_path),
            catalog_path: lookup("JOBDIGEST_CATALOG").map(PathBuf::from),
            digest_delay,
            log_level: lookup("JOBDIGEST_LOG").unwrap_or_else(|| "warn".to_string()),
        })
    }

    pub fn with_overrides(mut self, db: Option<PathBuf>, catalog: Option<PathBuf>) -> Self {
        if let Some(db) = db {
            self.db_path = db;
        }
        if catalog.is_some() {
            self.catalog_path = catalog;
        }
        self
    }
}
