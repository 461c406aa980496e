//! Static symbol mapping between human trading pairs and the
//! provider-specific identifiers. Pairs outside this table are ignored
//! by both feeds and rejected by trade submission.

pub struct PairMapping {
    /// Human-readable pair, e.g. "BTC/USDT".
    pub pair: &'static str,
    /// CoinGecko coin id used by the polling feed.
    pub coingecko_id: &'static str,
    /// Binance symbol used by the stream and order placement.
    pub binance_symbol: &'static str,
}

pub const PAIR_MAPPINGS: &[PairMapping] = &[
    PairMapping {
        pair: "BTC/USDT",
        coingecko_id: "bitcoin",
        binance_symbol: "BTCUSDT",
    },
    PairMapping {
        pair: "ETH/USDT",
        coingecko_id: "ethereum",
        binance_symbol: "ETHUSDT",
    },
    PairMapping {
        pair: "BNB/USDT",
        coingecko_id: "binancecoin",
        binance_symbol: "BNBUSDT",
    },
    PairMapping {
        pair: "ADA/USDT",
        coingecko_id: "cardano",
        binance_symbol: "ADAUSDT",
    },
    PairMapping {
        pair: "SOL/USDT",
        coingecko_id: "solana",
        binance_symbol: "SOLUSDT",
    },
    PairMapping {
        pair: "XRP/USDT",
        coingecko_id: "ripple",
        binance_symbol: "XRPUSDT",
    },
];

pub fn by_pair(pair: &str) -> Option<&'static PairMapping> {
    PAIR_MAPPINGS.iter().find(|m| m.pair == pair)
}

pub fn by_coingecko_id(id: &str) -> Option<&'static PairMapping> {
    PAIR_MAPPINGS.iter().find(|m| m.coingecko_id == id)
}

pub fn by_binance_symbol(symbol: &str) -> Option<&'static PairMapping> {
    PAIR_MAPPINGS.iter().find(|m| m.binance_symbol == symbol)
}

pub fn coingecko_ids() -> Vec<String> {
    PAIR_MAPPINGS
        .iter()
        .map(|m| m.coingecko_id.to_string())
        .collect()
}

pub fn binance_symbols() -> Vec<String> {
    PAIR_MAPPINGS
        .iter()
        .map(|m| m.binance_symbol.to_string())
        .collect()
}
