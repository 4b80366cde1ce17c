//! Crate-level error types

use thiserror::Error;

use crate::provider::ProviderError;
use crate::store::StoreError;

/// Errors a synchronization run can surface to callers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SyncError {
    /// Input rejected before any remote call was made (bad symbol, bad
    /// range string).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A storage failure mid-backfill. `persisted` counts insertions that
    /// already reached disk before the failure; earlier flushes survive.
    #[error("storage error after {persisted} insertion(s) persisted: {source}")]
    Storage {
        persisted: usize,
        #[source]
        source: StoreError,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_converts_and_keeps_message() {
        let err: SyncError = ProviderError::Status {
            status: 503,
            body: "unavailable".into(),
        }
        .into();
        assert!(matches!(err, SyncError::Provider(_)));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_storage_error_reports_persisted_count() {
        let err = SyncError::Storage {
            persisted: 3,
            source: StoreError::Io {
                path: "data/cloud/AAPL.csv".into(),
                source: std::io::Error::other("disk full"),
            },
        };
        assert!(err.to_string().contains("3 insertion(s)"));
    }
}
