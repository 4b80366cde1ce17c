//! Message budget accounting
//!
//! Tracks message spend for one run against an optional hard cap, and decides
//! whether an estimated cost is small enough to proceed without an explicit
//! confirmation. Units are provider message credits, not currency.

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info};

/// Budget limits for a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageLimits {
    /// Hard cap on messages spent in one run. `None` means uncapped.
    pub max_messages_per_run: Option<u64>,
    /// Estimated costs at or below this proceed without confirmation.
    pub auto_approve_threshold: u64,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_messages_per_run: None,
            auto_approve_threshold: 100,
        }
    }
}

/// One recorded charge.
#[derive(Debug, Clone)]
pub struct SpendRecord {
    pub cost: u64,
    pub description: String,
}

/// Per-run spend tracker.
///
/// Costs recorded here come from the provider's responses; the ledger only
/// accumulates and compares, it never computes a charge itself.
pub struct MessageLedger {
    limits: MessageLimits,
    records: RwLock<Vec<SpendRecord>>,
}

impl MessageLedger {
    pub fn new(limits: MessageLimits) -> Self {
        Self {
            limits,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Total messages spent so far this run.
    pub fn spent(&self) -> u64 {
        self.records.read().iter().map(|r| r.cost).sum()
    }

    /// Record a charge reported by the provider.
    pub fn record(&self, cost: u64, description: &str) {
        debug!(cost, description, "recording message spend");
        self.records.write().push(SpendRecord {
            cost,
            description: description.to_string(),
        });
    }

    /// If spending `cost` more would break the per-run cap, returns the
    /// reason; `None` means the spend fits.
    pub fn would_exceed(&self, cost: u64) -> Option<String> {
        let cap = self.limits.max_messages_per_run?;
        let spent = self.spent();
        if spent + cost > cap {
            Some(format!(
                "would exceed per-run message cap: {spent} + {cost} > {cap}"
            ))
        } else {
            None
        }
    }

    /// True when an estimated cost is small enough to skip confirmation and
    /// still fits the cap.
    pub fn can_auto_approve(&self, estimated_cost: u64) -> bool {
        estimated_cost <= self.limits.auto_approve_threshold
            && self.would_exceed(estimated_cost).is_none()
    }

    /// Warnings for spend approaching the cap (>= 80%).
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(cap) = self.limits.max_messages_per_run {
            if cap > 0 {
                let spent = self.spent();
                let pct = spent * 100 / cap;
                if pct >= 80 {
                    warnings.push(format!(
                        "message spend at {pct}% of per-run cap ({spent} / {cap})"
                    ));
                }
            }
        }
        warnings
    }

    /// Log the final accounting for the run.
    pub fn log_summary(&self) {
        let records = self.records.read();
        info!(
            total = records.iter().map(|r| r.cost).sum::<u64>(),
            calls = records.len(),
            "message spend summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capped(cap: u64, threshold: u64) -> MessageLedger {
        MessageLedger::new(MessageLimits {
            max_messages_per_run: Some(cap),
            auto_approve_threshold: threshold,
        })
    }

    #[test]
    fn test_initial_spend_is_zero() {
        let ledger = MessageLedger::new(MessageLimits::default());
        assert_eq!(ledger.spent(), 0);
    }

    #[test]
    fn test_record_accumulates() {
        let ledger = MessageLedger::new(MessageLimits::default());
        ledger.record(2, "date 2024-01-02");
        ledger.record(2, "date 2024-01-03");
        assert_eq!(ledger.spent(), 4);
    }

    #[test]
    fn test_uncapped_never_exceeds() {
        let ledger = MessageLedger::new(MessageLimits::default());
        assert!(ledger.would_exceed(u64::MAX / 2).is_none());
    }

    #[test]
    fn test_cap_enforced() {
        let ledger = capped(10, 100);
        ledger.record(8, "spend");
        assert!(ledger.would_exceed(2).is_none());
        assert!(ledger.would_exceed(3).is_some());
    }

    #[test]
    fn test_auto_approve_threshold() {
        let ledger = capped(1000, 50);
        assert!(ledger.can_auto_approve(50));
        assert!(!ledger.can_auto_approve(51));
    }

    #[test]
    fn test_auto_approve_respects_cap() {
        let ledger = capped(10, 50);
        // below threshold but over the cap
        assert!(!ledger.can_auto_approve(20));
    }

    #[test]
    fn test_warning_near_cap() {
        let ledger = capped(10, 100);
        ledger.record(8, "spend");
        let warnings = ledger.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("80%"));
    }

    #[test]
    fn test_no_warning_below_threshold() {
        let ledger = capped(10, 100);
        ledger.record(7, "spend");
        assert!(ledger.warnings().is_empty());
    }
}
