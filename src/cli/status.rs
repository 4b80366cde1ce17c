//! Status command
//!
//! Reports local coverage and what a sync would fetch, without touching the
//! provider. Needs no token.

use anyhow::Result;
use chrono::Local;
use clap::Args;

use super::RunContext;
use crate::reconcile::{additional_dates, missing_dates};
use crate::store::SeriesStore;

/// Arguments for the status command
#[derive(Args)]
pub struct StatusArgs {
    /// Instrument symbol (e.g. AAPL, BRK.B)
    #[arg(long, short)]
    pub symbol: String,

    /// Use the sandbox environment
    #[arg(long)]
    pub sandbox: bool,

    /// List every missing date instead of just the count
    #[arg(long)]
    pub verbose: bool,
}

/// Execute the status command
pub fn execute(args: StatusArgs) -> Result<()> {
    let ctx = RunContext::new(&args.symbol, args.sandbox)?;
    let store = ctx.store();

    let Some(series) = store.read()? else {
        println!(
            "No local series for {} at {}",
            ctx.symbol,
            store.path().display()
        );
        println!("Run sync to perform the initial fetch");
        return Ok(());
    };

    let calendar = ctx.calendar();
    let missing = missing_dates(&calendar, &series)?;
    let trailing = additional_dates(&series, Local::now().date_naive())?;

    println!("{}: {} row(s)", ctx.symbol, series.len());
    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        println!("Coverage: {first} to {last}");
    }

    if missing.is_empty() {
        println!("No interior gaps");
    } else {
        println!("{} interior gap(s)", missing.len());
        if args.verbose {
            for date in &missing {
                println!("  {date}");
            }
        }
    }

    match trailing {
        Some(range) => {
            let trading = range.days().filter(|d| calendar.is_trading_day(*d)).count();
            println!("Trailing range {range} ({trading} trading day(s))");
        }
        None => println!("Series is current"),
    }
    Ok(())
}
