//! Sync command
//!
//! One reconciliation pass: read the local series, compute interior gaps and
//! the trailing range, confirm the spend, then backfill date by date. With no
//! local series the pass degrades to a cold-start bulk fetch of a named
//! range. Safe to rerun after any stop; gaps are recomputed from whatever was
//! persisted.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Args;
use tracing::{info, warn};

use super::{prompt_yes_no, RunContext};
use crate::error::SyncError;
use crate::provider::{DailyCloseProvider, HistoricalRange};
use crate::reconcile::{
    BackfillReport, ConfirmationGate, MessageLedger, Reconciler, StopReason,
};
use crate::series::DailySeries;
use crate::store::SeriesStore;

/// Arguments for the sync command
#[derive(Args)]
pub struct SyncArgs {
    /// Instrument symbol (e.g. AAPL, BRK.B)
    #[arg(long, short)]
    pub symbol: String,

    /// Use the sandbox environment and token
    #[arg(long)]
    pub sandbox: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Show what would be fetched without spending any messages
    #[arg(long)]
    pub dry_run: bool,

    /// Named range for the initial fetch when no local series exists
    #[arg(long, default_value = "max")]
    pub initial_range: HistoricalRange,
}

/// Confirmation gate backed by an interactive prompt. Small spends below the
/// configured auto-approve threshold proceed without asking.
struct PromptGate<'a> {
    symbol: &'a str,
    ledger: &'a MessageLedger,
}

impl ConfirmationGate for PromptGate<'_> {
    fn confirm(&self, pending: usize, estimated_cost: u64) -> bool {
        if self.ledger.can_auto_approve(estimated_cost) {
            info!(pending, estimated_cost, "auto-approved below threshold");
            return true;
        }
        prompt_yes_no(&format!(
            "Backfill {pending} date(s) for {} at an estimated {estimated_cost} message(s). Proceed?",
            self.symbol
        ))
    }
}

/// Execute the sync command
pub async fn execute(args: SyncArgs) -> Result<()> {
    let ctx = RunContext::new(&args.symbol, args.sandbox)?;
    let store = ctx.store();
    let today = Local::now().date_naive();

    match store.read()? {
        None => cold_start(&ctx, &args, &store).await,
        Some(series) => reconcile(&ctx, &args, &store, series, today).await,
    }
}

/// No usable local series: one bulk fetch of the requested named range.
async fn cold_start(
    ctx: &RunContext,
    args: &SyncArgs,
    store: &dyn SeriesStore,
) -> Result<()> {
    let estimated = args.initial_range.estimated_message_cost();
    println!(
        "No local series for {} ({}); initial fetch of range '{}' estimated at {estimated} message(s)",
        ctx.symbol,
        environment(args.sandbox),
        args.initial_range
    );
    if args.dry_run {
        println!("Dry run, nothing fetched");
        return Ok(());
    }

    let ledger = ctx.ledger();
    let needs_prompt = ctx.settings.backfill.require_confirmation
        && !args.yes
        && !ledger.can_auto_approve(estimated);
    if needs_prompt && !prompt_yes_no("Proceed with the initial fetch?") {
        println!("Aborted, nothing fetched");
        return Ok(());
    }

    let client = ctx.client()?;
    let fetched = client.fetch_range(args.initial_range).await?;
    ledger.record(
        fetched.cost,
        &format!("initial {} range for {}", args.initial_range, ctx.symbol),
    );
    if fetched.series.is_empty() {
        warn!(symbol = %ctx.symbol, "provider returned an empty range");
        println!("Provider returned no data; nothing persisted ({} message(s) spent)", fetched.cost);
        return Ok(());
    }
    store.write(&fetched.series)?;

    println!(
        "Fetched {} row(s) spanning {} to {} ({} message(s) spent)",
        fetched.series.len(),
        fetched.series.first_date().unwrap_or_default(),
        fetched.series.last_date().unwrap_or_default(),
        fetched.cost
    );
    ledger.log_summary();
    Ok(())
}

/// Existing local series: gap reconciliation and per-date backfill.
async fn reconcile(
    ctx: &RunContext,
    args: &SyncArgs,
    store: &dyn SeriesStore,
    mut series: DailySeries,
    today: NaiveDate,
) -> Result<()> {
    let calendar = ctx.calendar();
    let ledger = ctx.ledger();

    let missing = crate::reconcile::missing_dates(&calendar, &series)?;
    let trailing = crate::reconcile::additional_dates(&series, today)?;

    let mut candidates: Vec<NaiveDate> = missing.iter().copied().collect();
    let mut trailing_count = 0usize;
    if let Some(range) = trailing {
        let trailing_days: Vec<NaiveDate> = range
            .days()
            .filter(|d| calendar.is_trading_day(*d))
            .collect();
        trailing_count = trailing_days.len();
        candidates.extend(trailing_days);
    }

    println!(
        "{} ({}): {} row(s), {} interior gap(s), {} trailing trading day(s)",
        ctx.symbol,
        environment(args.sandbox),
        series.len(),
        missing.len(),
        trailing_count
    );

    if candidates.is_empty() {
        println!("Series is up to date");
        return Ok(());
    }

    let client = ctx.client()?;
    if args.dry_run {
        let estimated = candidates.len() as u64 * client.estimated_date_cost();
        println!(
            "Dry run: would fetch {} date(s) at an estimated {estimated} message(s)",
            candidates.len()
        );
        return Ok(());
    }

    let gate = PromptGate {
        symbol: &ctx.symbol,
        ledger: &ledger,
    };
    let gate_ref = if args.yes || !ctx.settings.backfill.require_confirmation {
        None
    } else {
        Some(&gate)
    };

    let reconciler = Reconciler::new(&calendar, &client, store, &ledger);
    let report = reconciler.backfill(candidates, &mut series, gate_ref).await?;
    print_report(&report, &ledger);
    ledger.log_summary();

    match report.stopped_by {
        Some(StopReason::Transport(e)) => Err(anyhow::Error::new(SyncError::from(e))
            .context("backfill stopped on a provider error; rerun to resume")),
        _ => Ok(()),
    }
}

fn print_report(report: &BackfillReport, ledger: &MessageLedger) {
    if report.declined {
        println!("Declined, nothing fetched");
        return;
    }
    println!(
        "Inserted {} value(s), skipped {} no-data date(s), spent {} message(s)",
        report.inserted, report.skipped_no_data, report.messages_spent
    );
    if let Some(StopReason::Budget(reason)) = &report.stopped_by {
        println!("Stopped early: {reason}");
        println!("Rerun to resume; committed insertions are kept");
    }
    for warning in ledger.warnings() {
        println!("Warning: {warning}");
    }
}

fn environment(sandbox: bool) -> &'static str {
    if sandbox {
        "sandbox"
    } else {
        "cloud"
    }
}
