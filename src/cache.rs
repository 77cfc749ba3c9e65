use crate::error::{CacheError, ProviderError};
use crate::provider::RateSource;
use crate::rates::RateTable;
use jiff::Zoned;
use jiff::civil::DateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CACHE_FILE_NAME: &str = "rates_cache.json";

/// A rate table and the local time it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime,
    pub quotes: RateTable,
}

impl CacheEntry {
    /// Fresh for the rest of the calendar day it was fetched on.
    pub fn is_fresh(&self, now: DateTime) -> bool {
        self.timestamp.date() == now.date()
    }
}

/// Single-file, same-day cache in front of a [`RateSource`].
///
/// Assumes one process at a time uses the file; there is no locking.
pub struct RateCache {
    path: PathBuf,
    refresh: bool,
}

impl RateCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            refresh: false,
        }
    }

    /// The cache file inside the application data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(CACHE_FILE_NAME))
    }

    /// Ignore any stored entry and always fetch.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Today's rates, from the cache file if it was written today, otherwise from `source`.
    pub fn get_rates(
        &self,
        source: &dyn RateSource,
        credential: &str,
    ) -> Result<RateTable, ProviderError> {
        self.get_rates_at(source, credential, Zoned::now().datetime())
    }

    /// [`Self::get_rates`] with an explicit local clock reading.
    pub fn get_rates_at(
        &self,
        source: &dyn RateSource,
        credential: &str,
        now: DateTime,
    ) -> Result<RateTable, ProviderError> {
        if !self.refresh {
            match self.read() {
                Ok(entry) if entry.is_fresh(now) => {
                    info!(fetched = %entry.timestamp, "using cached exchange rates");
                    return Ok(entry.quotes);
                }
                Ok(entry) => debug!(fetched = %entry.timestamp, "cached exchange rates are stale"),
                Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %self.path.display(), "no cached exchange rates")
                }
                Err(e) => warn!(path = %self.path.display(), error = %e, "ignoring unusable rate cache"),
            }
        }

        let quotes = source.fetch(credential)?;
        let entry = CacheEntry {
            timestamp: now,
            quotes,
        };
        if let Err(e) = self.write(&entry) {
            warn!(path = %self.path.display(), error = %e, "failed to save rate cache");
        }
        Ok(entry.quotes)
    }

    pub fn read(&self) -> Result<CacheEntry, CacheError> {
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Replace the cache file. The entry is written beside it first, then renamed over it.
    pub fn write(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(entry)?)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), "rate cache saved");
        Ok(())
    }
}
