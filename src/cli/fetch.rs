//! Fetch command
//!
//! Bulk fetch of a named historical range, merged into the local series.
//! Useful for widening coverage beyond the existing span, which the gap-based
//! sync never does.

use anyhow::Result;
use clap::Args;

use super::{prompt_yes_no, RunContext};
use crate::provider::{DailyCloseProvider, HistoricalRange};
use crate::store::SeriesStore;

/// Arguments for the fetch command
#[derive(Args)]
pub struct FetchArgs {
    /// Instrument symbol (e.g. AAPL, BRK.B)
    #[arg(long, short)]
    pub symbol: String,

    /// Use the sandbox environment and token
    #[arg(long)]
    pub sandbox: bool,

    /// Named range to fetch (max, 5y, 2y, 1y, 6m, 3m, 1m, 5d)
    #[arg(long, short, default_value = "1y")]
    pub range: HistoricalRange,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Show the estimated cost without fetching
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the fetch command
pub async fn execute(args: FetchArgs) -> Result<()> {
    let ctx = RunContext::new(&args.symbol, args.sandbox)?;
    let estimated = args.range.estimated_message_cost();
    println!(
        "Range '{}' for {} estimated at {estimated} message(s)",
        args.range, ctx.symbol
    );
    if args.dry_run {
        println!("Dry run, nothing fetched");
        return Ok(());
    }

    let ledger = ctx.ledger();
    let needs_prompt = ctx.settings.backfill.require_confirmation
        && !args.yes
        && !ledger.can_auto_approve(estimated);
    if needs_prompt && !prompt_yes_no("Proceed with the fetch?") {
        println!("Aborted, nothing fetched");
        return Ok(());
    }

    let client = ctx.client()?;
    let fetched = client.fetch_range(args.range).await?;
    ledger.record(
        fetched.cost,
        &format!("{} range for {}", args.range, ctx.symbol),
    );

    if fetched.series.is_empty() {
        println!(
            "Provider returned no data; nothing persisted ({} message(s) spent)",
            fetched.cost
        );
        return Ok(());
    }

    // Merge into whatever is already on disk; fetched values win on overlap.
    let store = ctx.store();
    let mut series = store.read()?.unwrap_or_default();
    let before = series.len();
    for (date, close) in fetched.series.iter() {
        series.insert(date, close);
    }
    store.write(&series)?;

    println!(
        "Merged {} fetched row(s), {} new ({} message(s) spent)",
        fetched.series.len(),
        series.len() - before,
        fetched.cost
    );
    ledger.log_summary();
    Ok(())
}
