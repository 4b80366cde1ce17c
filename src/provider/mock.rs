//! Scripted provider for tests
//!
//! Returns pre-programmed outcomes in order and records every requested date,
//! so reconciliation tests can assert exactly which remote calls happened and
//! in what order.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{
    DailyCloseProvider, FetchOutcome, HistoricalRange, ProviderError, ProviderResult, RangeFetch,
};

/// Provider whose responses are scripted up front.
#[derive(Default)]
pub struct MockProvider {
    date_cost: u64,
    outcomes: Mutex<VecDeque<ProviderResult<FetchOutcome>>>,
    range_result: Mutex<Option<ProviderResult<RangeFetch>>>,
    requested_dates: Mutex<Vec<NaiveDate>>,
    requested_ranges: Mutex<Vec<HistoricalRange>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            date_cost: 2,
            ..Self::default()
        }
    }

    pub fn with_date_cost(mut self, cost: u64) -> Self {
        self.date_cost = cost;
        self
    }

    /// Queue the outcome for the next `fetch_date` call. Calls consume
    /// outcomes in FIFO order.
    pub fn push_outcome(&self, outcome: ProviderResult<FetchOutcome>) {
        self.outcomes.lock().push_back(outcome);
    }

    pub fn set_range_result(&self, result: ProviderResult<RangeFetch>) {
        *self.range_result.lock() = Some(result);
    }

    /// Dates requested so far, in call order.
    pub fn requested_dates(&self) -> Vec<NaiveDate> {
        self.requested_dates.lock().clone()
    }

    pub fn requested_ranges(&self) -> Vec<HistoricalRange> {
        self.requested_ranges.lock().clone()
    }
}

#[async_trait]
impl DailyCloseProvider for MockProvider {
    fn estimated_date_cost(&self) -> u64 {
        self.date_cost
    }

    async fn fetch_range(&self, range: HistoricalRange) -> ProviderResult<RangeFetch> {
        self.requested_ranges.lock().push(range);
        self.range_result
            .lock()
            .take()
            .unwrap_or_else(|| Err(ProviderError::Request("no scripted range result".into())))
    }

    async fn fetch_date(&self, date: NaiveDate) -> ProviderResult<FetchOutcome> {
        self.requested_dates.lock().push(date);
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Request("no scripted outcome".into())))
    }
}
