//! Coin Symbol Detection
//!
//! Finds the coin a query is about by matching a fixed vocabulary of names
//! and tickers. Short tickers that are also common English words ("link",
//! "dot", "uni", "atom") are only recognised by their project names.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// A supported coin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Coin {
    /// Lowercase ticker (e.g., "btc")
    pub symbol: &'static str,

    /// Display name (e.g., "Bitcoin")
    pub name: &'static str,

    #[serde(skip)]
    aliases: &'static [&'static str],
}

const fn coin(symbol: &'static str, name: &'static str, aliases: &'static [&'static str]) -> Coin {
    Coin { symbol, name, aliases }
}

/// Vocabulary; the first entry is the default
pub const COINS: &[Coin] = &[
    coin("btc", "Bitcoin", &["bitcoin", "btc", "xbt"]),
    coin("eth", "Ethereum", &["ethereum", "ether", "eth"]),
    coin("sol", "Solana", &["solana", "sol"]),
    coin("ada", "Cardano", &["cardano", "ada"]),
    coin("doge", "Dogecoin", &["dogecoin", "doge"]),
    coin("xrp", "XRP", &["ripple", "xrp"]),
    coin("dot", "Polkadot", &["polkadot"]),
    coin("link", "Chainlink", &["chainlink"]),
    coin("avax", "Avalanche", &["avalanche", "avax"]),
    coin("matic", "Polygon", &["polygon", "matic"]),
    coin("ltc", "Litecoin", &["litecoin", "ltc"]),
    coin("shib", "Shiba Inu", &["shiba inu", "shiba", "shib"]),
    coin("uni", "Uniswap", &["uniswap"]),
    coin("atom", "Cosmos", &["cosmos"]),
    coin("bnb", "BNB", &["binance coin", "bnb"]),
    coin("trx", "TRON", &["tron", "trx"]),
    coin("pepe", "Pepe", &["pepe"]),
    coin("sui", "Sui", &["sui"]),
];

/// Coin used when a query names none
pub const DEFAULT_COIN: Coin = COINS[0];

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let mut aliases: Vec<&str> = COINS.iter().flat_map(|c| c.aliases.iter().copied()).collect();
    // Longest first so "shiba inu" wins over "shiba"
    aliases.sort_by_key(|a| std::cmp::Reverse(a.len()));
    let alternation = aliases
        .iter()
        .map(|a| regex::escape(a).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\$?\b({alternation})\b")).expect("coin vocabulary regex is valid")
});

/// Coin mentioned earliest in the query, if any
pub fn find_coin(query: &str) -> Option<Coin> {
    let matched = PATTERN.captures(query)?.get(1)?.as_str().to_lowercase();
    let normalized = matched.split_whitespace().collect::<Vec<_>>().join(" ");
    COINS
        .iter()
        .find(|c| c.aliases.contains(&normalized.as_str()))
        .copied()
}

/// Coin mentioned in the query, or [`DEFAULT_COIN`]
pub fn extract_symbol(query: &str) -> Coin {
    find_coin(query).unwrap_or(DEFAULT_COIN)
}

/// Look up a coin by ticker
pub fn by_symbol(symbol: &str) -> Option<Coin> {
    let symbol = symbol.trim().trim_start_matches('$').to_ascii_lowercase();
    COINS.iter().find(|c| c.symbol == symbol).copied()
}
