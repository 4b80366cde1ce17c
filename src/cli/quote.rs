//! Quote command

use anyhow::Result;
use clap::Args;
use rust_decimal::Decimal;

use super::RunContext;

/// Arguments for the quote command
#[derive(Args)]
pub struct QuoteArgs {
    /// Instrument symbol (e.g. AAPL, BRK.B)
    #[arg(long, short)]
    pub symbol: String,

    /// Use the sandbox environment and token
    #[arg(long)]
    pub sandbox: bool,
}

/// Execute the quote command
pub async fn execute(args: QuoteArgs) -> Result<()> {
    let ctx = RunContext::new(&args.symbol, args.sandbox)?;
    let client = ctx.client()?;
    let fetched = client.fetch_quote().await?;
    let quote = fetched.quote;

    match quote.latest_price {
        Some(price) => println!("{}: {price}", quote.symbol),
        None => println!("{}: no price available", quote.symbol),
    }
    if let Some(change) = quote.change_percent {
        // IEX reports the change as a fraction (0.0123 = +1.23%)
        println!("Change: {}%", (change * Decimal::from(100)).round_dp(2));
    }
    if let Some(open) = quote.is_us_market_open {
        println!("Market: {}", if open { "open" } else { "closed" });
    }
    if let Some(time) = &quote.latest_time {
        println!("As of {time}");
    }
    println!("Messages used: {}", fetched.cost);
    Ok(())
}
