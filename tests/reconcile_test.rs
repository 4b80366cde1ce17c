//! End-to-end reconciliation tests against an instrumented in-memory store
//!
//! The store counts every write so these tests can pin down the durability
//! contract exactly: one flush per successful insertion, no flush for no-data
//! or declined runs, and committed flushes surviving a mid-loop failure.

use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use series_manager::calendar::TradingCalendar;
use series_manager::error::SyncError;
use series_manager::provider::mock::MockProvider;
use series_manager::provider::{FetchOutcome, ProviderError};
use series_manager::reconcile::{
    ConfirmationGate, MessageLedger, MessageLimits, Reconciler, StopReason,
};
use series_manager::series::DailySeries;
use series_manager::store::{SeriesStore, StoreError, StoreResult};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn close(value: i64) -> FetchOutcome {
    FetchOutcome::Close {
        value: Decimal::from(value),
        cost: 2,
    }
}

/// In-memory store recording a snapshot of every write. `fail_after` makes
/// the n-th write onward fail like a disk error.
#[derive(Default)]
struct RecordingStore {
    writes: Mutex<Vec<DailySeries>>,
    fail_after: Option<usize>,
}

impl RecordingStore {
    fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    fn last_write(&self) -> Option<DailySeries> {
        self.writes.lock().last().cloned()
    }
}

impl SeriesStore for RecordingStore {
    fn read(&self) -> StoreResult<Option<DailySeries>> {
        Ok(self.last_write())
    }

    fn write(&self, series: &DailySeries) -> StoreResult<()> {
        let mut writes = self.writes.lock();
        if let Some(cap) = self.fail_after {
            if writes.len() >= cap {
                return Err(StoreError::Io {
                    path: "mem://TEST".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
        }
        writes.push(series.clone());
        Ok(())
    }
}

struct Harness {
    calendar: TradingCalendar,
    provider: MockProvider,
    store: RecordingStore,
    ledger: MessageLedger,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(RecordingStore::default())
    }

    fn with_store(store: RecordingStore) -> Self {
        Self {
            calendar: TradingCalendar::us_markets(),
            provider: MockProvider::new(),
            store,
            ledger: MessageLedger::new(MessageLimits::default()),
        }
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.calendar, &self.provider, &self.store, &self.ledger)
    }
}

const NO_GATE: Option<&dyn ConfirmationGate> = None;

#[tokio::test]
async fn one_flush_per_successful_insertion() {
    let harness = Harness::new();
    harness.provider.push_outcome(Ok(close(101)));
    harness.provider.push_outcome(Ok(close(102)));

    // series ends Fri 2024-01-05; Mon and Tue are genuine candidates
    let mut series: DailySeries = [(date(2024, 1, 5), Decimal::from(100))]
        .into_iter()
        .collect();
    let report = harness
        .reconciler()
        .backfill([date(2024, 1, 8), date(2024, 1, 9)], &mut series, NO_GATE)
        .await
        .unwrap();

    assert_eq!(report.inserted, 2);
    // insert-then-flush: two insertions, two writes, each a superset of the
    // previous
    assert_eq!(harness.store.write_count(), 2);
    let writes = harness.store.writes.lock();
    assert_eq!(writes[0].len(), 2);
    assert_eq!(writes[1].len(), 3);
    assert!(writes[1].contains(date(2024, 1, 9)));
}

#[tokio::test]
async fn transport_error_keeps_committed_flushes() {
    let harness = Harness::new();
    harness.provider.push_outcome(Ok(close(101)));
    harness
        .provider
        .push_outcome(Err(ProviderError::Status {
            status: 503,
            body: "unavailable".into(),
        }));
    harness.provider.push_outcome(Ok(close(103)));

    let mut series: DailySeries = [(date(2024, 1, 5), Decimal::from(100))]
        .into_iter()
        .collect();
    let report = harness
        .reconciler()
        .backfill(
            [date(2024, 1, 8), date(2024, 1, 9), date(2024, 1, 10)],
            &mut series,
            NO_GATE,
        )
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    assert!(matches!(report.stopped_by, Some(StopReason::Transport(_))));
    // the third scripted outcome was never consumed
    assert_eq!(harness.provider.requested_dates().len(), 2);
    // exactly the first insertion reached the store
    assert_eq!(harness.store.write_count(), 1);
    let persisted = harness.store.last_write().unwrap();
    assert!(persisted.contains(date(2024, 1, 8)));
    assert!(!persisted.contains(date(2024, 1, 9)));
}

#[tokio::test]
async fn no_data_never_flushes() {
    let harness = Harness::new();
    for _ in 0..3 {
        harness
            .provider
            .push_outcome(Ok(FetchOutcome::NoData { cost: 2 }));
    }

    let mut series: DailySeries = [(date(2024, 1, 5), Decimal::from(100))]
        .into_iter()
        .collect();
    let report = harness
        .reconciler()
        .backfill(
            [date(2024, 1, 8), date(2024, 1, 9), date(2024, 1, 10)],
            &mut series,
            NO_GATE,
        )
        .await
        .unwrap();

    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped_no_data, 3);
    assert_eq!(harness.store.write_count(), 0);
    // spend still happened and is visible to the caller
    assert_eq!(report.messages_spent, 6);
}

#[tokio::test]
async fn declined_gate_leaves_everything_untouched() {
    let harness = Harness::new();
    let mut series: DailySeries = [(date(2024, 1, 5), Decimal::from(100))]
        .into_iter()
        .collect();
    let before = series.clone();

    let decline = |_: usize, _: u64| false;
    let report = harness
        .reconciler()
        .backfill([date(2024, 1, 8)], &mut series, Some(&decline))
        .await
        .unwrap();

    assert!(report.declined);
    assert_eq!(report.inserted, 0);
    assert_eq!(series, before);
    assert_eq!(harness.store.write_count(), 0);
    assert!(harness.provider.requested_dates().is_empty());
    assert_eq!(harness.ledger.spent(), 0);
}

#[tokio::test]
async fn storage_failure_aborts_with_persisted_count() {
    // first write succeeds, second fails
    let harness = Harness::with_store(RecordingStore::failing_after(1));
    harness.provider.push_outcome(Ok(close(101)));
    harness.provider.push_outcome(Ok(close(102)));
    harness.provider.push_outcome(Ok(close(103)));

    let mut series: DailySeries = [(date(2024, 1, 5), Decimal::from(100))]
        .into_iter()
        .collect();
    let err = harness
        .reconciler()
        .backfill(
            [date(2024, 1, 8), date(2024, 1, 9), date(2024, 1, 10)],
            &mut series,
            NO_GATE,
        )
        .await
        .unwrap_err();

    // progress can no longer be recorded, so the run aborts before burning
    // more budget on the third date
    match err {
        SyncError::Storage { persisted, .. } => assert_eq!(persisted, 1),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert_eq!(harness.provider.requested_dates().len(), 2);
    assert_eq!(harness.store.write_count(), 1);
}

#[tokio::test]
async fn rerun_resumes_from_persisted_state() {
    let harness = Harness::new();
    harness.provider.push_outcome(Ok(close(101)));
    harness
        .provider
        .push_outcome(Err(ProviderError::Request("connection reset".into())));

    let mut series: DailySeries = [(date(2024, 1, 5), Decimal::from(100))]
        .into_iter()
        .collect();
    let candidates = [date(2024, 1, 8), date(2024, 1, 9)];
    let first = harness
        .reconciler()
        .backfill(candidates, &mut series, NO_GATE)
        .await
        .unwrap();
    assert_eq!(first.inserted, 1);

    // A rerun works from the persisted series: the already-committed date is
    // filtered out before any fetch, so its cost is never spent twice.
    harness.provider.push_outcome(Ok(close(102)));
    let mut resumed = harness.store.read().unwrap().unwrap();
    let second = harness
        .reconciler()
        .backfill(candidates, &mut resumed, NO_GATE)
        .await
        .unwrap();

    assert_eq!(second.inserted, 1);
    assert_eq!(
        harness.provider.requested_dates(),
        vec![date(2024, 1, 8), date(2024, 1, 9), date(2024, 1, 9)]
    );
    assert!(resumed.contains(date(2024, 1, 8)));
    assert!(resumed.contains(date(2024, 1, 9)));
}
