//! Local series persistence
//!
//! The store owns the on-disk copy of a series. Absence (no file yet, or a
//! present-but-empty file) is a cold start, not an error; a file that exists
//! but cannot be parsed is corruption and is surfaced as such.

mod csv_store;
mod symbol_cache;

pub use csv_store::CsvSeriesStore;
pub use symbol_cache::SymbolCache;

use std::path::PathBuf;
use thiserror::Error;

use crate::series::DailySeries;

/// Storage errors. Absence is modeled as `Ok(None)` on read, never as an
/// error variant.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed series file {path} (line {line}): {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for a single instrument's series.
///
/// `write` must replace the file atomically — a reader never observes a
/// half-written file — and must be safe to call once per insertion in a
/// tight loop: durability over throughput.
pub trait SeriesStore {
    /// Read the persisted series, ascending by date. `Ok(None)` when no
    /// usable prior data exists (missing or empty file).
    fn read(&self) -> StoreResult<Option<DailySeries>>;

    /// Persist the full series, sorted ascending, atomically replacing any
    /// previous file.
    fn write(&self, series: &DailySeries) -> StoreResult<()>;
}
