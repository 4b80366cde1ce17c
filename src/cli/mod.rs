//! Command-line interface
//!
//! Provides CLI commands for the series manager.

pub mod fetch;
pub mod quote;
pub mod status;
pub mod symbols;
pub mod sync;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};

use crate::calendar::TradingCalendar;
use crate::config::Settings;
use crate::provider::IexClient;
use crate::reconcile::MessageLedger;
use crate::store::CsvSeriesStore;
use crate::symbol::is_valid_symbol;

/// Series Manager CLI
#[derive(Parser)]
#[command(name = "series-manager")]
#[command(about = "Reconciles and backfills locally persisted daily close series")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the local series with the provider and backfill gaps
    Sync(sync::SyncArgs),
    /// Show local series coverage and detected gaps without fetching
    Status(status::StatusArgs),
    /// Bulk fetch a named historical range into the local series
    Fetch(fetch::FetchArgs),
    /// Show the latest quote for a symbol
    Quote(quote::QuoteArgs),
    /// Fetch or show the cached symbol reference list for a region
    Symbols(symbols::SymbolsArgs),
}

/// Shared per-invocation context: validated symbol, loaded settings and the
/// environment flag every command needs.
pub(crate) struct RunContext {
    pub settings: Settings,
    pub symbol: String,
    pub sandbox: bool,
}

impl RunContext {
    pub fn new(symbol: &str, sandbox: bool) -> Result<Self> {
        if !is_valid_symbol(symbol) {
            return Err(anyhow!(
                "invalid symbol '{symbol}' (expected 1-4 uppercase letters, optionally '.A'/'.B')"
            ));
        }
        let settings = Settings::load().unwrap_or_default();
        Ok(Self {
            settings,
            symbol: symbol.to_string(),
            sandbox,
        })
    }

    /// Context for commands not bound to one instrument (reference data).
    /// The client's symbol is unused on those endpoints.
    pub fn for_reference(sandbox: bool) -> Result<Self> {
        Ok(Self {
            settings: Settings::load().unwrap_or_default(),
            symbol: String::new(),
            sandbox,
        })
    }

    pub fn store(&self) -> CsvSeriesStore {
        CsvSeriesStore::for_symbol(&self.settings.storage.data_dir, &self.symbol, self.sandbox)
    }

    pub fn calendar(&self) -> TradingCalendar {
        TradingCalendar::us_markets()
            .with_extra_closures(self.settings.calendar.extra_closures.iter().copied())
    }

    pub fn ledger(&self) -> MessageLedger {
        MessageLedger::new(self.settings.backfill.limits.clone())
    }

    /// Provider client for the chosen environment. Fails when no token is
    /// configured; the token itself is never printed or logged.
    pub fn client(&self) -> Result<IexClient> {
        let env_var = if self.sandbox {
            "IEX_SANDBOX_TOKEN"
        } else {
            "IEX_TOKEN"
        };
        let token = self
            .settings
            .provider
            .token_for(self.sandbox)
            .with_context(|| format!("no provider token configured (set {env_var})"))?;
        Ok(IexClient::new(self.symbol.clone(), token, self.sandbox))
    }
}

/// Ask a yes/no question on stdout and read the answer from stdin. Anything
/// other than `y`/`yes` (case-insensitive) is a no.
pub(crate) fn prompt_yes_no(question: &str) -> bool {
    print!("{question} [y/N]: ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
