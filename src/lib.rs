//! Series Manager
//!
//! Keeps a locally persisted daily close series in sync with a metered
//! remote provider. The core is the reconciliation and backfill engine in
//! [`reconcile`]: it detects interior gaps and the trailing range against a
//! trading calendar, then drives a sequential, budget-aware, crash-safe
//! backfill that persists after every successful insertion.

pub mod calendar;
pub mod cli;
pub mod config;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod series;
pub mod store;
pub mod symbol;
