//! Reconciliation and backfill engine
//!
//! Compares the locally persisted series against the trading calendar to find
//! interior gaps and the trailing range past the last entry, then drives a
//! sequential, budget-aware backfill: one date at a time, persisting the full
//! series after every successful insertion so progress survives a crash or a
//! budget stop. A rerun recomputes the gap sets from the updated local series
//! and resumes without duplicating spend.
//!
//! Candidate dates are filtered through the calendar before any fetch, so no
//! budget is spent on dates known in advance to be closures. Days the
//! calendar believes are open but the provider has nothing for come back as
//! "no data" and are skipped without an insert.

pub mod ledger;

pub use ledger::{MessageLedger, MessageLimits};

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::calendar::TradingCalendar;
use crate::error::{SyncError, SyncResult};
use crate::provider::{DailyCloseProvider, FetchOutcome, ProviderError};
use crate::series::{DailySeries, DateRange};
use crate::store::SeriesStore;

/// Caller-supplied approval step consulted before any budget is spent.
/// Returning `false` aborts the backfill with zero side effects.
pub trait ConfirmationGate {
    /// `pending` dates would be fetched at an estimated `estimated_cost`
    /// message units.
    fn confirm(&self, pending: usize, estimated_cost: u64) -> bool;
}

impl<F: Fn(usize, u64) -> bool> ConfirmationGate for F {
    fn confirm(&self, pending: usize, estimated_cost: u64) -> bool {
        self(pending, estimated_cost)
    }
}

/// Why a backfill loop stopped before exhausting its candidates.
#[derive(Debug)]
pub enum StopReason {
    /// The provider call failed; committed insertions are kept.
    Transport(ProviderError),
    /// The next fetch would break the per-run message cap.
    Budget(String),
}

/// Outcome of one backfill pass. Every stop condition reports the insertions
/// committed so far, so the caller can display a consistent resume point.
#[derive(Debug, Default)]
pub struct BackfillReport {
    /// Values fetched, inserted and persisted.
    pub inserted: usize,
    /// Dates the provider reported no data for.
    pub skipped_no_data: usize,
    /// Message units spent during this pass.
    pub messages_spent: u64,
    /// The confirmation gate declined; nothing was fetched.
    pub declined: bool,
    /// Set when the loop stopped early.
    pub stopped_by: Option<StopReason>,
}

/// The reconciliation engine for one instrument's series.
pub struct Reconciler<'a> {
    calendar: &'a TradingCalendar,
    provider: &'a dyn DailyCloseProvider,
    store: &'a dyn SeriesStore,
    ledger: &'a MessageLedger,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        calendar: &'a TradingCalendar,
        provider: &'a dyn DailyCloseProvider,
        store: &'a dyn SeriesStore,
        ledger: &'a MessageLedger,
    ) -> Self {
        Self {
            calendar,
            provider,
            store,
            ledger,
        }
    }

    /// Interior gaps in `series`; see [`missing_dates`].
    pub fn missing_dates(&self, series: &DailySeries) -> SyncResult<BTreeSet<NaiveDate>> {
        missing_dates(self.calendar, series)
    }

    /// Trailing range past the series' last entry; see [`additional_dates`].
    pub fn additional_dates(
        &self,
        series: &DailySeries,
        today: NaiveDate,
    ) -> SyncResult<Option<DateRange>> {
        additional_dates(series, today)
    }

    /// Fetch and insert values for every candidate date that is a trading day
    /// not already present in `series`, persisting the full series after each
    /// successful insertion.
    ///
    /// Stops early on a transport error or when the next fetch would break
    /// the message cap; both are reported in the returned `BackfillReport`
    /// rather than as an `Err`, since committed work is valid either way. An
    /// `Err` is returned only when persisting fails, because progress can no
    /// longer be durably recorded.
    pub async fn backfill<I, G>(
        &self,
        candidates: I,
        series: &mut DailySeries,
        gate: Option<&G>,
    ) -> SyncResult<BackfillReport>
    where
        I: IntoIterator<Item = NaiveDate>,
        G: ConfirmationGate + ?Sized,
    {
        let dates: BTreeSet<NaiveDate> = candidates
            .into_iter()
            .filter(|d| self.calendar.is_trading_day(*d) && !series.contains(*d))
            .collect();

        let mut report = BackfillReport::default();
        if dates.is_empty() {
            debug!("no dates to backfill");
            return Ok(report);
        }

        let estimated_cost = dates.len() as u64 * self.provider.estimated_date_cost();
        if let Some(gate) = gate {
            if !gate.confirm(dates.len(), estimated_cost) {
                info!(pending = dates.len(), "backfill declined");
                report.declined = true;
                return Ok(report);
            }
        }

        for date in dates {
            if let Some(reason) = self.ledger.would_exceed(self.provider.estimated_date_cost()) {
                warn!(%date, %reason, "stopping backfill at message cap");
                report.stopped_by = Some(StopReason::Budget(reason));
                break;
            }

            match self.provider.fetch_date(date).await {
                Ok(FetchOutcome::Close { value, cost }) => {
                    self.ledger.record(cost, &format!("close for {date}"));
                    report.messages_spent += cost;
                    series.insert(date, value);
                    // Flush before moving on: the provider charge is already
                    // spent and must not be re-spent on a crash-retry.
                    self.store.write(series).map_err(|source| {
                        SyncError::Storage {
                            persisted: report.inserted,
                            source,
                        }
                    })?;
                    report.inserted += 1;
                    debug!(%date, %value, "inserted and persisted");
                }
                Ok(FetchOutcome::NoData { cost }) => {
                    self.ledger.record(cost, &format!("no data for {date}"));
                    report.messages_spent += cost;
                    report.skipped_no_data += 1;
                    debug!(%date, "no data, skipping");
                }
                Err(e) => {
                    warn!(%date, error = %e, "fetch failed, stopping backfill");
                    report.stopped_by = Some(StopReason::Transport(e));
                    break;
                }
            }
        }

        info!(
            inserted = report.inserted,
            skipped = report.skipped_no_data,
            spent = report.messages_spent,
            "backfill pass complete"
        );
        Ok(report)
    }
}

/// Interior gaps: trading days within `[first, last]` of the series that
/// have no value. Never returns a date outside the series' span; leading and
/// trailing gaps are [`additional_dates`]'s concern. An empty series is a
/// precondition violation, not "no gaps".
pub fn missing_dates(
    calendar: &TradingCalendar,
    series: &DailySeries,
) -> SyncResult<BTreeSet<NaiveDate>> {
    let (first, last) = span(series)?;
    let missing: BTreeSet<NaiveDate> = calendar
        .trading_days(first, last)
        .into_iter()
        .filter(|d| !series.contains(*d))
        .collect();
    debug!(
        span = %DateRange::new(first, last),
        gaps = missing.len(),
        "computed interior gaps"
    );
    Ok(missing)
}

/// Trailing range past the series' last entry, up to and including `today`.
/// `None` when the series is already current. The range is not filtered to
/// trading days here; filtering happens uniformly in backfill so trailing
/// dates are treated exactly like interior gaps.
pub fn additional_dates(series: &DailySeries, today: NaiveDate) -> SyncResult<Option<DateRange>> {
    let (_, last) = span(series)?;
    let next = last.succ_opt().ok_or_else(|| {
        SyncError::InvalidInput(format!("series ends at unrepresentable date {last}"))
    })?;
    if next <= today {
        Ok(Some(DateRange::new(next, today)))
    } else {
        Ok(None)
    }
}

fn span(series: &DailySeries) -> SyncResult<(NaiveDate, NaiveDate)> {
    match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(SyncError::InvalidInput(
            "cannot reconcile an empty series".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::provider::ProviderError;
    use crate::store::CsvSeriesStore;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series_of(dates: &[NaiveDate]) -> DailySeries {
        dates
            .iter()
            .map(|d| (*d, Decimal::from(100)))
            .collect()
    }

    struct Fixture {
        calendar: TradingCalendar,
        provider: MockProvider,
        store: CsvSeriesStore,
        ledger: MessageLedger,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                calendar: TradingCalendar::us_markets(),
                provider: MockProvider::new(),
                store: CsvSeriesStore::new(dir.path().join("TEST.csv")),
                ledger: MessageLedger::new(MessageLimits::default()),
                _dir: dir,
            }
        }

        fn with_limits(limits: MessageLimits) -> Self {
            let mut fixture = Self::new();
            fixture.ledger = MessageLedger::new(limits);
            fixture
        }

        fn reconciler(&self) -> Reconciler<'_> {
            Reconciler::new(&self.calendar, &self.provider, &self.store, &self.ledger)
        }
    }

    #[test]
    fn test_missing_dates_finds_interior_weekday_gaps() {
        let fixture = Fixture::new();
        // Mon 2024-01-08 .. Fri 2024-01-12, Wed and Thu absent
        let series = series_of(&[
            date(2024, 1, 8),
            date(2024, 1, 9),
            date(2024, 1, 12),
        ]);
        let missing = fixture.reconciler().missing_dates(&series).unwrap();
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec![date(2024, 1, 10), date(2024, 1, 11)]
        );
    }

    #[test]
    fn test_missing_dates_stays_inside_span() {
        let fixture = Fixture::new();
        let series = series_of(&[date(2024, 1, 9), date(2024, 1, 11)]);
        let missing = fixture.reconciler().missing_dates(&series).unwrap();
        for d in &missing {
            assert!(*d >= date(2024, 1, 9) && *d <= date(2024, 1, 11));
        }
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec![date(2024, 1, 10)]);
    }

    #[test]
    fn test_missing_dates_ignores_weekends_and_holidays() {
        let fixture = Fixture::new();
        // Fri 2023-12-29 .. Tue 2024-01-02; the weekend and New Year's Day
        // (Monday) are not gaps.
        let series = series_of(&[date(2023, 12, 29), date(2024, 1, 2)]);
        let missing = fixture.reconciler().missing_dates(&series).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_missing_dates_single_entry_is_empty() {
        let fixture = Fixture::new();
        let series = series_of(&[date(2024, 1, 8)]);
        assert!(fixture.reconciler().missing_dates(&series).unwrap().is_empty());
    }

    #[test]
    fn test_missing_dates_rejects_empty_series() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.reconciler().missing_dates(&DailySeries::new()),
            Err(SyncError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_additional_dates_none_when_current() {
        let fixture = Fixture::new();
        let series = series_of(&[date(2024, 1, 5)]);
        let range = fixture
            .reconciler()
            .additional_dates(&series, date(2024, 1, 5))
            .unwrap();
        assert!(range.is_none());
    }

    #[test]
    fn test_additional_dates_trailing_range_unfiltered() {
        let fixture = Fixture::new();
        let series = series_of(&[date(2024, 1, 5)]);
        let range = fixture
            .reconciler()
            .additional_dates(&series, date(2024, 1, 8))
            .unwrap()
            .unwrap();
        // includes the weekend; trading-day filtering happens in backfill
        assert_eq!(range, DateRange::new(date(2024, 1, 6), date(2024, 1, 8)));
    }

    #[tokio::test]
    async fn test_backfill_empty_candidates_is_a_no_op() {
        let fixture = Fixture::new();
        let mut series = series_of(&[date(2024, 1, 8)]);
        let report = fixture
            .reconciler()
            .backfill(std::iter::empty(), &mut series, None::<&dyn ConfirmationGate>)
            .await
            .unwrap();
        assert_eq!(report.inserted, 0);
        assert!(fixture.provider.requested_dates().is_empty());
        // the store was never touched
        assert!(fixture.store.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backfill_filters_non_trading_days_before_fetching() {
        let fixture = Fixture::new();
        fixture.provider.push_outcome(Ok(FetchOutcome::Close {
            value: Decimal::from(101),
            cost: 2,
        }));

        let mut series = series_of(&[date(2024, 1, 5)]);
        // Sat, Sun, Mon candidates; only Monday should reach the provider
        let candidates = [date(2024, 1, 6), date(2024, 1, 7), date(2024, 1, 8)];
        let report = fixture
            .reconciler()
            .backfill(candidates, &mut series, None::<&dyn ConfirmationGate>)
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(fixture.provider.requested_dates(), vec![date(2024, 1, 8)]);
        assert_eq!(series.get(date(2024, 1, 8)), Some(Decimal::from(101)));
    }

    #[tokio::test]
    async fn test_backfill_skips_dates_already_present() {
        let fixture = Fixture::new();
        let mut series = series_of(&[date(2024, 1, 8)]);
        let report = fixture
            .reconciler()
            .backfill([date(2024, 1, 8)], &mut series, None::<&dyn ConfirmationGate>)
            .await
            .unwrap();
        assert_eq!(report.inserted, 0);
        assert!(fixture.provider.requested_dates().is_empty());
    }

    #[tokio::test]
    async fn test_declined_gate_has_zero_side_effects() {
        let fixture = Fixture::new();
        let mut series = series_of(&[date(2024, 1, 5)]);
        let decline = |_pending: usize, _cost: u64| false;
        let report = fixture
            .reconciler()
            .backfill([date(2024, 1, 8)], &mut series, Some(&decline))
            .await
            .unwrap();

        assert!(report.declined);
        assert_eq!(report.inserted, 0);
        assert!(fixture.provider.requested_dates().is_empty());
        assert_eq!(fixture.ledger.spent(), 0);
        assert!(fixture.store.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gate_sees_pending_count_and_estimate() {
        let fixture = Fixture::new();
        let mut series = series_of(&[date(2024, 1, 5)]);
        // Mon + Tue pending at 2 units each
        let gate = |pending: usize, cost: u64| {
            assert_eq!(pending, 2);
            assert_eq!(cost, 4);
            false
        };
        fixture
            .reconciler()
            .backfill(
                [date(2024, 1, 8), date(2024, 1, 9)],
                &mut series,
                Some(&gate),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transport_error_stops_loop_and_keeps_committed_work() {
        let fixture = Fixture::new();
        fixture.provider.push_outcome(Ok(FetchOutcome::Close {
            value: Decimal::from(101),
            cost: 2,
        }));
        fixture
            .provider
            .push_outcome(Err(ProviderError::Request("connection reset".into())));
        // scripted but must never be consumed
        fixture.provider.push_outcome(Ok(FetchOutcome::Close {
            value: Decimal::from(103),
            cost: 2,
        }));

        let mut series = series_of(&[date(2024, 1, 5)]);
        let report = fixture
            .reconciler()
            .backfill(
                [date(2024, 1, 8), date(2024, 1, 9), date(2024, 1, 10)],
                &mut series,
                None::<&dyn ConfirmationGate>,
            )
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert!(matches!(report.stopped_by, Some(StopReason::Transport(_))));
        // the loop stopped before the third date
        assert_eq!(
            fixture.provider.requested_dates(),
            vec![date(2024, 1, 8), date(2024, 1, 9)]
        );
        // the first insertion reached disk
        let persisted = fixture.store.read().unwrap().unwrap();
        assert!(persisted.contains(date(2024, 1, 8)));
        assert!(!persisted.contains(date(2024, 1, 10)));
    }

    #[tokio::test]
    async fn test_no_data_dates_never_insert_or_flush() {
        let fixture = Fixture::new();
        for _ in 0..3 {
            fixture
                .provider
                .push_outcome(Ok(FetchOutcome::NoData { cost: 2 }));
        }

        let mut series = series_of(&[date(2024, 1, 5)]);
        let report = fixture
            .reconciler()
            .backfill(
                [date(2024, 1, 8), date(2024, 1, 9), date(2024, 1, 10)],
                &mut series,
                None::<&dyn ConfirmationGate>,
            )
            .await
            .unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.skipped_no_data, 3);
        // no successful insert, so write was never called
        assert!(fixture.store.read().unwrap().is_none());
        // but the spend still happened and was accounted
        assert_eq!(report.messages_spent, 6);
        assert_eq!(fixture.ledger.spent(), 6);
    }

    #[tokio::test]
    async fn test_budget_cap_stops_before_overspend() {
        let fixture = Fixture::with_limits(MessageLimits {
            max_messages_per_run: Some(3),
            auto_approve_threshold: 100,
        });
        fixture.provider.push_outcome(Ok(FetchOutcome::Close {
            value: Decimal::from(101),
            cost: 2,
        }));

        let mut series = series_of(&[date(2024, 1, 5)]);
        let report = fixture
            .reconciler()
            .backfill(
                [date(2024, 1, 8), date(2024, 1, 9)],
                &mut series,
                None::<&dyn ConfirmationGate>,
            )
            .await
            .unwrap();

        // first fetch spends 2 of 3; a second estimated 2 would exceed
        assert_eq!(report.inserted, 1);
        assert!(matches!(report.stopped_by, Some(StopReason::Budget(_))));
        assert_eq!(fixture.provider.requested_dates(), vec![date(2024, 1, 8)]);
    }
}
