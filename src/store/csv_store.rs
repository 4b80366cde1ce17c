//! CSV-backed series store
//!
//! One file per symbol per environment: `<data_dir>/{sandbox|cloud}/<SYMBOL>.csv`,
//! header `date,close`, dates formatted `%Y-%m-%d`. Writes go through a
//! sibling temp file followed by a rename so a crash mid-write never leaves a
//! partial file behind.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{SeriesStore, StoreError, StoreResult};
use crate::series::DailySeries;

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    close: Decimal,
}

/// CSV file store for a single instrument.
#[derive(Debug, Clone)]
pub struct CsvSeriesStore {
    path: PathBuf,
}

impl CsvSeriesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional path for a symbol: `<data_dir>/{sandbox|cloud}/<SYMBOL>.csv`.
    pub fn for_symbol(data_dir: &Path, symbol: &str, sandbox: bool) -> Self {
        let env_dir = if sandbox { "sandbox" } else { "cloud" };
        Self::new(data_dir.join(env_dir).join(format!("{symbol}.csv")))
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
}

impl SeriesStore for CsvSeriesStore {
    fn read(&self) -> StoreResult<Option<DailySeries>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no series file, cold start");
                return Ok(None);
            }
            Err(e) => return Err(self.io_err(e)),
        };

        // A file with no data rows (empty, or header only) is a cold start,
        // same as a missing file.
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        let mut series = DailySeries::new();
        for result in reader.deserialize::<CsvRow>() {
            let row = result.map_err(|e| StoreError::Malformed {
                path: self.path.clone(),
                line: e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or_default(),
                reason: e.to_string(),
            })?;
            // Duplicate dates on disk collapse to the last occurrence; the
            // BTreeMap re-sorts regardless of on-disk order.
            series.insert(row.date, row.close);
        }

        if series.is_empty() {
            return Ok(None);
        }

        debug!(path = %self.path.display(), rows = series.len(), "read series");
        Ok(Some(series))
    }

    fn write(&self, series: &DailySeries) -> StoreResult<()> {
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
            for (date, close) in series.iter() {
                writer
                    .serialize(CsvRow { date, close })
                    .map_err(|e| StoreError::Malformed {
                        path: tmp_path.clone(),
                        line: 0,
                        reason: e.to_string(),
                    })?;
            }
            writer.flush().map_err(|e| self.io_err(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_err(e))?;
        debug!(path = %self.path.display(), rows = series.len(), "wrote series");
        Ok(())
    }
}
