//! US trading calendar
//!
//! Pure reference data plus range queries: given `[start, end]`, which
//! calendar days is the market actually open? A date is a trading day iff it
//! is a weekday, not in the holiday table, and not in the exceptional-closure
//! set. No I/O, no wall clock — loaded once per run, immutable after.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;

use crate::series::DateRange;

/// Observed US market holidays, 2018–2026.
///
/// Hardcoded observed dates (shifted to the nearest weekday where the legal
/// holiday falls on a weekend). Extend the table as new years are published.
const US_HOLIDAYS: &[(i32, u32, u32)] = &[
    // 2018
    (2018, 1, 1),   // New Year's Day
    (2018, 1, 15),  // MLK Day
    (2018, 2, 19),  // Presidents' Day
    (2018, 3, 30),  // Good Friday
    (2018, 5, 28),  // Memorial Day
    (2018, 7, 4),   // Independence Day
    (2018, 9, 3),   // Labor Day
    (2018, 11, 22), // Thanksgiving
    (2018, 12, 25), // Christmas
    // 2019
    (2019, 1, 1),   // New Year's Day
    (2019, 1, 21),  // MLK Day
    (2019, 2, 18),  // Presidents' Day
    (2019, 4, 19),  // Good Friday
    (2019, 5, 27),  // Memorial Day
    (2019, 7, 4),   // Independence Day
    (2019, 9, 2),   // Labor Day
    (2019, 11, 28), // Thanksgiving
    (2019, 12, 25), // Christmas
    // 2020
    (2020, 1, 1),   // New Year's Day
    (2020, 1, 20),  // MLK Day
    (2020, 2, 17),  // Presidents' Day
    (2020, 4, 10),  // Good Friday
    (2020, 5, 25),  // Memorial Day
    (2020, 7, 3),   // Independence Day (observed — July 4 falls on Saturday)
    (2020, 9, 7),   // Labor Day
    (2020, 11, 26), // Thanksgiving
    (2020, 12, 25), // Christmas
    // 2021
    (2021, 1, 1),   // New Year's Day
    (2021, 1, 18),  // MLK Day
    (2021, 2, 15),  // Presidents' Day
    (2021, 4, 2),   // Good Friday
    (2021, 5, 31),  // Memorial Day
    (2021, 7, 5),   // Independence Day (observed — July 4 falls on Sunday)
    (2021, 9, 6),   // Labor Day
    (2021, 11, 25), // Thanksgiving
    (2021, 12, 24), // Christmas (observed — December 25 falls on Saturday)
    // 2022 (Juneteenth first observed; New Year's Day fell on Saturday, not observed)
    (2022, 1, 17),  // MLK Day
    (2022, 2, 21),  // Presidents' Day
    (2022, 4, 15),  // Good Friday
    (2022, 5, 30),  // Memorial Day
    (2022, 6, 20),  // Juneteenth (observed — June 19 falls on Sunday)
    (2022, 7, 4),   // Independence Day
    (2022, 9, 5),   // Labor Day
    (2022, 11, 24), // Thanksgiving
    (2022, 12, 26), // Christmas (observed — December 25 falls on Sunday)
    // 2023
    (2023, 1, 2),   // New Year's Day (observed — January 1 falls on Sunday)
    (2023, 1, 16),  // MLK Day
    (2023, 2, 20),  // Presidents' Day
    (2023, 4, 7),   // Good Friday
    (2023, 5, 29),  // Memorial Day
    (2023, 6, 19),  // Juneteenth
    (2023, 7, 4),   // Independence Day
    (2023, 9, 4),   // Labor Day
    (2023, 11, 23), // Thanksgiving
    (2023, 12, 25), // Christmas
    // 2024
    (2024, 1, 1),   // New Year's Day
    (2024, 1, 15),  // MLK Day
    (2024, 2, 19),  // Presidents' Day
    (2024, 3, 29),  // Good Friday
    (2024, 5, 27),  // Memorial Day
    (2024, 6, 19),  // Juneteenth
    (2024, 7, 4),   // Independence Day
    (2024, 9, 2),   // Labor Day
    (2024, 11, 28), // Thanksgiving
    (2024, 12, 25), // Christmas
    // 2025
    (2025, 1, 1),   // New Year's Day
    (2025, 1, 20),  // MLK Day
    (2025, 2, 17),  // Presidents' Day
    (2025, 4, 18),  // Good Friday
    (2025, 5, 26),  // Memorial Day
    (2025, 6, 19),  // Juneteenth
    (2025, 7, 4),   // Independence Day
    (2025, 9, 1),   // Labor Day
    (2025, 11, 27), // Thanksgiving
    (2025, 12, 25), // Christmas
    // 2026
    (2026, 1, 1),   // New Year's Day
    (2026, 1, 19),  // MLK Day
    (2026, 2, 16),  // Presidents' Day
    (2026, 4, 3),   // Good Friday
    (2026, 5, 25),  // Memorial Day
    (2026, 6, 19),  // Juneteenth
    (2026, 7, 3),   // Independence Day (observed — July 4 falls on Saturday)
    (2026, 9, 7),   // Labor Day
    (2026, 11, 26), // Thanksgiving
    (2026, 12, 25), // Christmas
];

/// Exceptional closures: weekdays the provider has no data for that are not
/// regular holidays. Reference data, extendable via configuration.
const EXCEPTIONAL_CLOSURES: &[(i32, u32, u32)] = &[
    // US markets closed December 5, 2018: National Day of Mourning for
    // President George H. W. Bush.
    (2018, 12, 5),
];

/// Trading-day membership queries over holiday and closure reference data.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    holidays: BTreeSet<NaiveDate>,
    closures: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    /// Calendar for US equity markets with the builtin holiday table and
    /// exceptional-closure list.
    pub fn us_markets() -> Self {
        Self {
            holidays: US_HOLIDAYS
                .iter()
                .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
                .collect(),
            closures: EXCEPTIONAL_CLOSURES
                .iter()
                .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
                .collect(),
        }
    }

    /// Add closures beyond the builtin list (e.g. from configuration).
    pub fn with_extra_closures<I: IntoIterator<Item = NaiveDate>>(mut self, extra: I) -> Self {
        self.closures.extend(extra);
        self
    }

    /// True iff the market is open on `date`: a weekday that is neither a
    /// holiday nor an exceptional closure.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        !self.holidays.contains(&date) && !self.closures.contains(&date)
    }

    /// All trading days in `[start, end]`, ascending. `start > end` yields an
    /// empty set, not an error.
    pub fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> BTreeSet<NaiveDate> {
        DateRange::new(start, end)
            .days()
            .filter(|d| self.is_trading_day(*d))
            .collect()
    }
}
