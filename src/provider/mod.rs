//! Remote provider boundary
//!
//! Defines the interface the reconciler consumes: fetch one day's close or a
//! bulk named range, with every outcome carrying the message cost the call
//! charged. The provider is the sole source of cost figures — the reconciler
//! displays and accumulates them but never computes them independently.
//!
//! Retry/backoff policy does not live here; a transport failure is surfaced
//! once and the caller decides.

mod iex;
pub mod mock;

pub use iex::{IexClient, Quote, QuoteFetch, SymbolListing, SymbolsFetch};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::series::DailySeries;

/// Provider error types.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result of one single-date fetch.
///
/// "No data" is explicitly distinct from a transport error (the date may be a
/// closure the calendar does not know about, or the provider genuinely has
/// nothing) and is never treated as a zero close. Transport errors travel as
/// `Err(ProviderError)` on the call itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The provider returned a close for the requested day.
    Close { value: Decimal, cost: u64 },
    /// Valid request, but the provider has nothing for the day.
    NoData { cost: u64 },
}

impl FetchOutcome {
    /// Budget units this call charged.
    pub fn cost(&self) -> u64 {
        match self {
            FetchOutcome::Close { cost, .. } | FetchOutcome::NoData { cost } => *cost,
        }
    }
}

/// Result of one bulk range fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFetch {
    pub series: DailySeries,
    /// Budget units the call charged.
    pub cost: u64,
}

/// Named historical ranges the provider accepts for bulk fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoricalRange {
    Max,
    FiveYears,
    TwoYears,
    OneYear,
    SixMonths,
    ThreeMonths,
    OneMonth,
    FiveDays,
}

/// Trading days per year used for pre-fetch cost estimates: 52 weeks of 5
/// days minus 9 holidays.
const ANNUAL_TRADING_DAYS: u64 = 52 * 5 - 9;

impl HistoricalRange {
    /// URL path segment the provider expects.
    pub fn path_segment(&self) -> &'static str {
        match self {
            HistoricalRange::Max => "max",
            HistoricalRange::FiveYears => "5y",
            HistoricalRange::TwoYears => "2y",
            HistoricalRange::OneYear => "1y",
            HistoricalRange::SixMonths => "6m",
            HistoricalRange::ThreeMonths => "3m",
            HistoricalRange::OneMonth => "1m",
            HistoricalRange::FiveDays => "5d",
        }
    }

    /// Approximate trading days the range covers. `max` is capped at five
    /// years — unpaid accounts cannot reach further back.
    pub fn approx_trading_days(&self) -> u64 {
        match self {
            HistoricalRange::Max | HistoricalRange::FiveYears => ANNUAL_TRADING_DAYS * 5,
            HistoricalRange::TwoYears => ANNUAL_TRADING_DAYS * 2,
            HistoricalRange::OneYear => ANNUAL_TRADING_DAYS,
            HistoricalRange::SixMonths => ANNUAL_TRADING_DAYS / 2,
            HistoricalRange::ThreeMonths => ANNUAL_TRADING_DAYS / 4,
            HistoricalRange::OneMonth => ANNUAL_TRADING_DAYS / 12,
            HistoricalRange::FiveDays => 5,
        }
    }

    /// Estimated budget units a bulk fetch of this range will cost, surfaced
    /// to the caller before any spend.
    pub fn estimated_message_cost(&self) -> u64 {
        self.approx_trading_days() * iex::ADJUSTED_CLOSE_WEIGHT
    }
}

impl std::fmt::Display for HistoricalRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for HistoricalRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(HistoricalRange::Max),
            "5y" => Ok(HistoricalRange::FiveYears),
            "2y" => Ok(HistoricalRange::TwoYears),
            "1y" => Ok(HistoricalRange::OneYear),
            "6m" => Ok(HistoricalRange::SixMonths),
            "3m" => Ok(HistoricalRange::ThreeMonths),
            "1m" => Ok(HistoricalRange::OneMonth),
            "5d" => Ok(HistoricalRange::FiveDays),
            other => Err(format!(
                "invalid range '{other}' (expected max, 5y, 2y, 1y, 6m, 3m, 1m or 5d)"
            )),
        }
    }
}

/// Capability the reconciler consumes to fetch daily closes.
#[async_trait]
pub trait DailyCloseProvider: Send + Sync {
    /// Budget units a single-date call is expected to cost, surfaced before
    /// spending.
    fn estimated_date_cost(&self) -> u64;

    /// Bulk fetch for a named range. Callers log and surface failures; no
    /// automatic retry inside this contract.
    async fn fetch_range(&self, range: HistoricalRange) -> ProviderResult<RangeFetch>;

    /// Fetch one day's close.
    async fn fetch_date(&self, date: NaiveDate) -> ProviderResult<FetchOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_round_trip() {
        for s in ["max", "5y", "2y", "1y", "6m", "3m", "1m", "5d"] {
            let range: HistoricalRange = s.parse().unwrap();
            assert_eq!(range.path_segment(), s);
        }
        assert!("ytd".parse::<HistoricalRange>().is_err());
    }

    #[test]
    fn test_estimated_cost_scales_with_range() {
        assert_eq!(HistoricalRange::OneYear.estimated_message_cost(), 251 * 2);
        assert_eq!(HistoricalRange::FiveDays.estimated_message_cost(), 10);
        // max is capped at five years of history
        assert_eq!(
            HistoricalRange::Max.estimated_message_cost(),
            HistoricalRange::FiveYears.estimated_message_cost()
        );
    }

    #[test]
    fn test_outcome_cost() {
        let close = FetchOutcome::Close {
            value: Decimal::from(100),
            cost: 2,
        };
        assert_eq!(close.cost(), 2);
        assert_eq!(FetchOutcome::NoData { cost: 2 }.cost(), 2);
    }
}
