//! Ticker symbol validation
//!
//! Accepts 1–4 uppercase letters with an optional `.A`/`.B` share-class
//! suffix (e.g. `BRK.B`). Validation happens at the CLI boundary before any
//! remote call is made.

use regex::Regex;
use std::sync::OnceLock;

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{1,4}(\.[AB])?$").expect("valid symbol regex"))
}

/// True when `symbol` matches the accepted ticker format.
pub fn is_valid_symbol(symbol: &str) -> bool {
    symbol_pattern().is_match(symbol)
}
