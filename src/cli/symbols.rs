//! Symbols command
//!
//! Region symbol reference list, cached on disk per environment because a
//! fresh fetch costs 100 messages. Reads the cache unless `--refresh` is
//! given or no cache exists yet.

use anyhow::Result;
use clap::Args;

use super::RunContext;
use crate::store::SymbolCache;

/// Arguments for the symbols command
#[derive(Args)]
pub struct SymbolsArgs {
    /// Region to list (e.g. us, gb)
    #[arg(long, short, default_value = "us")]
    pub region: String,

    /// Use the sandbox environment and token
    #[arg(long)]
    pub sandbox: bool,

    /// Refetch from the provider even when a cache exists
    #[arg(long)]
    pub refresh: bool,

    /// Print every listing instead of just the count
    #[arg(long)]
    pub verbose: bool,
}

/// Execute the symbols command
pub async fn execute(args: SymbolsArgs) -> Result<()> {
    let ctx = RunContext::for_reference(args.sandbox)?;
    let cache = SymbolCache::for_region(&ctx.settings.storage.data_dir, &args.region, args.sandbox);

    let listings = match (args.refresh, cache.read()?) {
        (false, Some(cached)) => {
            println!(
                "{} symbol(s) for region '{}' from cache at {}",
                cached.len(),
                args.region,
                cache.path().display()
            );
            cached
        }
        _ => {
            let client = ctx.client()?;
            let ledger = ctx.ledger();
            let fetched = client.fetch_region_symbols(&args.region).await?;
            ledger.record(
                fetched.cost,
                &format!("symbol list for region {}", args.region),
            );
            cache.write(&fetched.listings)?;
            println!(
                "Fetched {} symbol(s) for region '{}' ({} message(s) spent), cached at {}",
                fetched.listings.len(),
                args.region,
                fetched.cost,
                cache.path().display()
            );
            fetched.listings
        }
    };

    if args.verbose {
        for listing in &listings {
            println!("{}\t{}", listing.symbol, listing.name);
        }
    }
    Ok(())
}
