//! Region symbol list cache
//!
//! The symbol reference list costs 100 messages per fetch, so it is cached to
//! `<data_dir>/{sandbox|cloud}/symbols-<region>.csv` and reused until the
//! caller asks for a refresh. Same atomicity rules as the series store.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{StoreError, StoreResult};
use crate::provider::SymbolListing;

/// CSV-backed cache of one region's symbol listings.
#[derive(Debug, Clone)]
pub struct SymbolCache {
    path: PathBuf,
}

impl SymbolCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional path: `<data_dir>/{sandbox|cloud}/symbols-<region>.csv`.
    pub fn for_region(data_dir: &Path, region: &str, sandbox: bool) -> Self {
        let env_dir = if sandbox { "sandbox" } else { "cloud" };
        Self::new(data_dir.join(env_dir).join(format!("symbols-{region}.csv")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Cached listings, `Ok(None)` when no usable cache exists.
    pub fn read(&self) -> StoreResult<Option<Vec<SymbolListing>>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        let mut listings = Vec::new();
        for result in reader.deserialize::<SymbolListing>() {
            let listing = result.map_err(|e| StoreError::Malformed {
                path: self.path.clone(),
                line: e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or_default(),
                reason: e.to_string(),
            })?;
            listings.push(listing);
        }

        if listings.is_empty() {
            return Ok(None);
        }
        debug!(path = %self.path.display(), rows = listings.len(), "read symbol cache");
        Ok(Some(listings))
    }

    /// Replace the cache atomically.
    pub fn write(&self, listings: &[SymbolListing]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path).map_err(|e| {
                StoreError::Malformed {
                    path: tmp_path.clone(),
                    line: 0,
                    reason: e.to_string(),
                }
            })?;
            for listing in listings {
                writer
                    .serialize(listing)
                    .map_err(|e| StoreError::Malformed {
                        path: tmp_path.clone(),
                        line: 0,
                        reason: e.to_string(),
                    })?;
            }
            writer.flush().map_err(|e| self.io_err(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_err(e))?;
        debug!(path = %self.path.display(), rows = listings.len(), "wrote symbol cache");
        Ok(())
    }
}
