//! Ticker classification for mixed B3 / BDR / US portfolios.
//!
//! Classification is a pure function over the literal ticker string: no I/O,
//! total over every input. Unknown shapes default to the domestic market,
//! which is the safest choice for a B3-centric portfolio.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Suffix Yahoo Finance expects for B3-listed symbols.
pub const DOMESTIC_SUFFIX: &str = ".SA";

/// BDRs that would otherwise pass the domestic or foreign shape checks.
const KNOWN_BDRS: &[&str] = &[
    "NVDC34", "A1MD34", "GOGL34", "MSFT34", "AAPL34", "AMZO34", "NFLX34",
];

/// B3-listed ETFs whose "name + 11" shape the BDR check could misread.
const DOMESTIC_ETFS: &[&str] = &["BOVA11", "SMAL11", "IVVB11", "PIBB11"];

/// Common US ETFs, accepted as foreign regardless of shape.
const FOREIGN_ETFS: &[&str] = &[
    "SPY", "VOO", "QQQ", "IVV", "VTI", "SPYI", "IEF", "TLT", "AGG", "BND", "VEA", "VWO", "GLD",
    "VIG", "VXUS", "SPHD",
];

/// Bare-letter prefixes of well-known B3 issuers; these must not be taken
/// for 4-letter US tickers.
const DOMESTIC_EXCEPTIONS: &[&str] = &["VALE", "PETR", "ITUB", "BBDC", "BBAS", "ABEV", "ITSA"];

/// BDR base code to underlying foreign ticker. Bases missing here fall back
/// to the base itself (trailing series digits stripped).
const BDR_UNDERLYING: &[(&str, &str)] = &[
    ("NVDC", "NVDA"),
    ("A1MD", "AMD"),
    ("GOGL", "GOOG"),
    ("MSFT", "MSFT"),
    ("AAPL", "AAPL"),
    ("AMZO", "AMZN"),
    ("NFLX", "NFLX"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    /// B3-listed equity or ETF, priced in BRL.
    Domestic,
    /// US-listed equity or ETF, priced in USD.
    Foreign,
    /// Brazilian depositary receipt; price and metadata lookups are
    /// redirected to the underlying foreign ticker.
    DepositaryReceipt,
}

impl Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Market::Domestic => "B3",
            Market::Foreign => "US",
            Market::DepositaryReceipt => "BDR",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub market: Market,
    /// Symbol to hand to the market data provider.
    pub lookup_symbol: String,
}

/// Classify a ticker and derive its provider lookup symbol.
pub fn classify(ticker: &str) -> Classification {
    let normalized = normalize(ticker);
    let t = normalized.as_str();

    if KNOWN_BDRS.contains(&t) || (is_bdr_shape(t) && !DOMESTIC_ETFS.contains(&t)) {
        return Classification {
            market: Market::DepositaryReceipt,
            lookup_symbol: underlying_ticker(t),
        };
    }

    if is_domestic_shape(t) || DOMESTIC_ETFS.contains(&t) {
        return Classification {
            market: Market::Domestic,
            lookup_symbol: format!("{t}{DOMESTIC_SUFFIX}"),
        };
    }

    if FOREIGN_ETFS.contains(&t) || (is_foreign_shape(t) && !DOMESTIC_EXCEPTIONS.contains(&t)) {
        return Classification {
            market: Market::Foreign,
            lookup_symbol: t.to_string(),
        };
    }

    // Unknown shape: assume domestic.
    Classification {
        market: Market::Domestic,
        lookup_symbol: format!("{t}{DOMESTIC_SUFFIX}"),
    }
}

/// Uppercase, trim, and strip an existing market suffix.
pub fn normalize(ticker: &str) -> String {
    let upper = ticker.trim().to_uppercase();
    upper
        .strip_suffix(DOMESTIC_SUFFIX)
        .or_else(|| upper.strip_suffix(".US"))
        .unwrap_or(&upper)
        .to_string()
}

/// 4-6 alphanumerics followed by a 34/35/36 series suffix, e.g. `AAPL34`.
fn is_bdr_shape(t: &str) -> bool {
    let len = t.len();
    if !t.is_ascii() || !(6..=8).contains(&len) {
        return false;
    }
    let (base, series) = t.split_at(len - 2);
    matches!(series, "34" | "35" | "36")
        && base.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// 3-6 letters followed by 1-2 digits, e.g. `PETR4`, `BOVA11`.
fn is_domestic_shape(t: &str) -> bool {
    let letters = t.chars().take_while(|c| c.is_ascii_uppercase()).count();
    let digits = t.len() - letters;
    (3..=6).contains(&letters)
        && (1..=2).contains(&digits)
        && t[letters..].chars().all(|c| c.is_ascii_digit())
}

/// 1-5 bare letters, e.g. `AAPL`, `SPY`.
fn is_foreign_shape(t: &str) -> bool {
    (1..=5).contains(&t.len()) && t.chars().all(|c| c.is_ascii_uppercase())
}

/// Map a BDR ticker to the underlying foreign ticker.
fn underlying_ticker(t: &str) -> String {
    let base = &t[..t.len().saturating_sub(2)];
    BDR_UNDERLYING
        .iter()
        .find(|(bdr, _)| *bdr == base)
        .map(|(_, underlying)| (*underlying).to_string())
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domestic_equity() {
        let c = classify("PETR4");
        assert_eq!(c.market, Market::Domestic);
        assert_eq!(c.lookup_symbol, "PETR4.SA");
    }

    #[test]
    fn test_domestic_equity_with_suffix() {
        let c = classify("vale3.sa");
        assert_eq!(c.market, Market::Domestic);
        assert_eq!(c.lookup_symbol, "VALE3.SA");
    }

    #[test]
    fn test_domestic_etf_allow_list() {
        for etf in ["BOVA11", "SMAL11", "IVVB11", "PIBB11"] {
            let c = classify(etf);
            assert_eq!(c.market, Market::Domestic, "{etf}");
            assert_eq!(c.lookup_symbol, format!("{etf}.SA"));
        }
    }

    #[test]
    fn test_foreign_etf() {
        let c = classify("SPY");
        assert_eq!(c.market, Market::Foreign);
        assert_eq!(c.lookup_symbol, "SPY");
    }

    #[test]
    fn test_foreign_equity_strips_us_suffix() {
        let c = classify(" aapl.US ");
        assert_eq!(c.market, Market::Foreign);
        assert_eq!(c.lookup_symbol, "AAPL");
    }

    #[test]
    fn test_bdr_maps_to_underlying() {
        let c = classify("AAPL34");
        assert_eq!(c.market, Market::DepositaryReceipt);
        assert_eq!(c.lookup_symbol, "AAPL");

        let c = classify("NVDC34");
        assert_eq!(c.market, Market::DepositaryReceipt);
        assert_eq!(c.lookup_symbol, "NVDA");

        let c = classify("AMZO34");
        assert_eq!(c.market, Market::DepositaryReceipt);
        assert_eq!(c.lookup_symbol, "AMZN");
    }

    #[test]
    fn test_bdr_shape_without_mapping_strips_series() {
        // Not in the known list; shape alone decides, base is kept.
        let c = classify("TSLA34");
        assert_eq!(c.market, Market::DepositaryReceipt);
        assert_eq!(c.lookup_symbol, "TSLA");
    }

    #[test]
    fn test_domestic_etf_not_mistaken_for_bdr() {
        // IVVB11 has a BDR-like alphanumeric body but sits on the allow list.
        let c = classify("IVVB11");
        assert_eq!(c.market, Market::Domestic);
    }

    #[test]
    fn test_domestic_exception_prefixes() {
        for t in ["VALE", "PETR", "ITUB", "BBDC", "BBAS", "ABEV", "ITSA"] {
            let c = classify(t);
            assert_eq!(c.market, Market::Domestic, "{t}");
            assert_eq!(c.lookup_symbol, format!("{t}.SA"));
        }
    }

    #[test]
    fn test_unknown_shape_defaults_to_domestic() {
        let c = classify("X1Y2Z3W4Q");
        assert_eq!(c.market, Market::Domestic);
        assert_eq!(c.lookup_symbol, "X1Y2Z3W4Q.SA");
    }

    #[test]
    fn test_total_over_odd_inputs() {
        // Never panics, always lands in exactly one market.
        for input in ["", " ", ".SA", "123", "ação", "A", "ABCDEFGHIJ34"] {
            let _ = classify(input);
        }
    }

    #[test]
    fn test_bdr_series_variants() {
        assert!(matches!(
            classify("GOGL35").market,
            Market::DepositaryReceipt
        ));
        assert!(matches!(
            classify("GOGL36").market,
            Market::DepositaryReceipt
        ));
        // 33 is not a BDR series
        assert!(!matches!(
            classify("GOGL33").market,
            Market::DepositaryReceipt
        ));
    }
}
