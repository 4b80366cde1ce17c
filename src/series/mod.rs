//! Daily close series and date-range primitives
//!
//! `DailySeries` is the canonical in-memory representation of a locally
//! persisted price history: one decimal close per trading date, keyed and
//! ordered by `NaiveDate`. Contiguity is not an invariant — gaps are exactly
//! what reconciliation detects.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Ordered mapping from trading date to daily close.
///
/// Backed by a `BTreeMap` so the series is sorted at all times: min/max key
/// lookup, point lookup/insert, and ordered iteration all come for free.
/// Dates are the canonical key type end to end; string formatting is confined
/// to the store and provider boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailySeries {
    points: BTreeMap<NaiveDate, Decimal>,
}

impl DailySeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Earliest date in the series.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    /// Latest date in the series.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    pub fn get(&self, date: NaiveDate) -> Option<Decimal> {
        self.points.get(&date).copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.points.contains_key(&date)
    }

    /// Insert a close for a date, returning the previous value if the date
    /// was already present. Keys stay unique; re-inserting replaces.
    pub fn insert(&mut self, date: NaiveDate, close: Decimal) -> Option<Decimal> {
        self.points.insert(date, close)
    }

    /// Iterate `(date, close)` pairs in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.points.iter().map(|(d, c)| (*d, *c))
    }
}

impl FromIterator<(NaiveDate, Decimal)> for DailySeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Decimal)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Inclusive calendar date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days in the range, endpoints included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// All calendar days in the range, ascending. Empty when `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
