//! Portfolio valuation: per-holding pricing, currency reconciliation and
//! aggregate metrics.
//!
//! The pricing pass is deliberately tolerant: a holding whose quote cannot
//! be fetched gets an estimated price, a missing exchange rate falls back to
//! an approximate constant, and either case is reported as a warning rather
//! than an error. Valuation always produces a result.

use crate::core::classify::{classify, Market};
use crate::core::config::Holding;
use crate::core::currency::{Currency, CurrencyRateProvider};
use crate::core::info::AssetInfo;
use crate::core::price::QuoteProvider;
use indicatif::ProgressBar;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Approximate USD to BRL rate used when no live rate can be fetched.
/// A stale stopgap, not a market value; every use is surfaced as a warning.
pub const FALLBACK_USD_BRL_RATE: f64 = 5.0;

/// Relative jitter applied to the average cost when estimating a price for
/// a holding whose quote could not be fetched.
const ESTIMATE_JITTER: f64 = 0.05;

/// A holding augmented with valuation-time figures. Recomputed on every
/// pass, never persisted.
#[derive(Debug, Clone)]
pub struct PricedHolding {
    pub holding: Holding,
    pub market: Market,
    /// Current price in the holding's own currency.
    pub current_price: f64,
    /// Current price converted to the reporting currency.
    pub current_price_reporting: f64,
    /// Cost and value in the holding's own currency.
    pub invested_value: f64,
    pub current_value: f64,
    /// Cost and value converted to the reporting currency.
    pub invested_value_reporting: f64,
    pub current_value_reporting: f64,
    /// Return in the holding's own currency.
    pub return_value: f64,
    pub return_percent: f64,
    /// True when the price is a jittered estimate rather than a quote.
    pub estimated: bool,
    pub sector: Option<String>,
    pub display_name: Option<String>,
}

/// Output of one pricing pass over a holdings list.
#[derive(Debug, Clone)]
pub struct PricedPortfolio {
    pub holdings: Vec<PricedHolding>,
    /// Foreign to reporting currency rate used for every conversion.
    pub exchange_rate: f64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Performer {
    pub ticker: String,
    pub return_percent: f64,
}

impl Performer {
    fn none() -> Self {
        Performer {
            ticker: "N/A".to_string(),
            return_percent: 0.0,
        }
    }
}

/// Aggregates for one group (a currency or a sector), in the reporting
/// currency.
#[derive(Debug, Clone, Default)]
pub struct GroupMetrics {
    pub invested: f64,
    pub current: f64,
    pub return_value: f64,
    pub return_percent: f64,
    /// Share of the portfolio's current value, in percent.
    pub share_percent: f64,
}

/// Aggregate snapshot of a priced portfolio, all figures in the reporting
/// currency.
#[derive(Debug, Clone)]
pub struct PortfolioMetrics {
    pub total_investment: f64,
    pub current_value: f64,
    pub total_return: f64,
    pub percent_return: f64,
    pub best_performer: Performer,
    pub worst_performer: Performer,
    pub currency_metrics: HashMap<Currency, GroupMetrics>,
    pub sector_metrics: HashMap<String, GroupMetrics>,
    pub exchange_rate: f64,
}

/// The exchange rate resolved for one pass, tagged with its direction.
#[derive(Debug, Clone, Copy)]
struct ResolvedRate {
    foreign: Currency,
    reporting: Currency,
    rate: f64,
}

impl ResolvedRate {
    /// Convert an amount between the two currencies of this pass.
    fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        if from == to {
            amount
        } else if from == self.foreign && to == self.reporting {
            amount * self.rate
        } else {
            debug_assert_eq!(from, self.reporting);
            amount / self.rate
        }
    }
}

fn foreign_of(reporting: Currency) -> Currency {
    match reporting {
        Currency::Brl => Currency::Usd,
        Currency::Usd => Currency::Brl,
    }
}

fn estimate_factor() -> f64 {
    1.0 + rand::thread_rng().gen_range(-ESTIMATE_JITTER..=ESTIMATE_JITTER)
}

pub struct Valuer<'a> {
    quotes: &'a (dyn QuoteProvider),
    rates: &'a (dyn CurrencyRateProvider),
    reporting: Currency,
}

impl<'a> Valuer<'a> {
    pub fn new(
        quotes: &'a (dyn QuoteProvider),
        rates: &'a (dyn CurrencyRateProvider),
        reporting: Currency,
    ) -> Self {
        Valuer {
            quotes,
            rates,
            reporting,
        }
    }

    /// Price every holding, converting mixed currencies against a single
    /// foreign/reporting rate. One failed ticker never aborts the pass.
    pub async fn price_holdings(
        &self,
        holdings: &[Holding],
        pb: &ProgressBar,
    ) -> PricedPortfolio {
        let mut warnings = Vec::new();
        let fx = self.resolve_rate(&mut warnings).await;

        let mut priced = Vec::with_capacity(holdings.len());
        for holding in holdings {
            priced.push(self.price_holding(holding, fx, &mut warnings).await);
            pb.inc(1);
        }

        PricedPortfolio {
            holdings: priced,
            exchange_rate: fx.rate,
            warnings,
        }
    }

    async fn resolve_rate(&self, warnings: &mut Vec<String>) -> ResolvedRate {
        let foreign = foreign_of(self.reporting);
        match self.rates.get_rate(foreign, self.reporting).await {
            Ok(rate) => {
                debug!(
                    "Using exchange rate {} -> {}: {}",
                    foreign, self.reporting, rate.rate
                );
                ResolvedRate {
                    foreign,
                    reporting: self.reporting,
                    rate: rate.rate,
                }
            }
            Err(e) => {
                let fallback = if foreign == Currency::Usd && self.reporting == Currency::Brl {
                    FALLBACK_USD_BRL_RATE
                } else {
                    1.0
                };
                warn!("Exchange rate fetch failed, using fallback {fallback}: {e}");
                warnings.push(format!(
                    "Could not fetch the {foreign} to {} exchange rate; using approximate rate {fallback}",
                    self.reporting
                ));
                ResolvedRate {
                    foreign,
                    reporting: self.reporting,
                    rate: fallback,
                }
            }
        }
    }

    async fn price_holding(
        &self,
        holding: &Holding,
        fx: ResolvedRate,
        warnings: &mut Vec<String>,
    ) -> PricedHolding {
        let classification = classify(&holding.ticker);

        let (current_price, estimated) = match self
            .quotes
            .fetch_quote(&classification.lookup_symbol)
            .await
        {
            Ok(quote) => {
                let price = fx.convert(quote.price, quote.currency, holding.currency);
                debug!(
                    "Quote for {} ({}): {} {} -> {} {}",
                    holding.ticker,
                    classification.lookup_symbol,
                    quote.price,
                    quote.currency,
                    price,
                    holding.currency
                );
                (price, false)
            }
            Err(e) => {
                warn!("Quote fetch failed for {}: {e}", holding.ticker);
                warnings.push(format!(
                    "No quote available for {}; showing an estimated price",
                    holding.ticker
                ));
                (holding.average_cost * estimate_factor(), true)
            }
        };

        let quantity = f64::from(holding.quantity);
        let invested_value = holding.average_cost * quantity;
        let current_value = current_price * quantity;
        let return_value = current_value - invested_value;
        let return_percent = if invested_value > 0.0 {
            return_value / invested_value * 100.0
        } else {
            0.0
        };

        PricedHolding {
            market: classification.market,
            current_price,
            current_price_reporting: fx.convert(current_price, holding.currency, self.reporting),
            invested_value,
            current_value,
            invested_value_reporting: fx.convert(invested_value, holding.currency, self.reporting),
            current_value_reporting: fx.convert(current_value, holding.currency, self.reporting),
            return_value,
            return_percent,
            estimated,
            sector: None,
            display_name: None,
            holding: holding.clone(),
        }
    }
}

/// Merge enrichment results into priced holdings by ticker.
pub fn apply_asset_info(holdings: &mut [PricedHolding], info: &HashMap<String, AssetInfo>) {
    for priced in holdings.iter_mut() {
        if let Some(asset) = info.get(&priced.holding.ticker) {
            priced.sector = asset.sector.clone();
            priced.display_name = asset.display_name.clone();
        }
    }
}

/// Aggregate a priced portfolio into reporting-currency metrics.
///
/// Totals are sums of converted values only; raw mixed-currency values are
/// never added together. Pure function, recomputed on demand.
pub fn compute_metrics(portfolio: &PricedPortfolio) -> PortfolioMetrics {
    let holdings = &portfolio.holdings;

    let total_investment: f64 = holdings.iter().map(|h| h.invested_value_reporting).sum();
    let current_value: f64 = holdings.iter().map(|h| h.current_value_reporting).sum();
    let total_return = current_value - total_investment;
    let percent_return = if total_investment > 0.0 {
        total_return / total_investment * 100.0
    } else {
        0.0
    };

    // Strict comparisons keep the first occurrence on ties.
    let mut best = Performer::none();
    let mut worst = Performer::none();
    for (i, h) in holdings.iter().enumerate() {
        if i == 0 || h.return_percent > best.return_percent {
            best = Performer {
                ticker: h.holding.ticker.clone(),
                return_percent: h.return_percent,
            };
        }
        if i == 0 || h.return_percent < worst.return_percent {
            worst = Performer {
                ticker: h.holding.ticker.clone(),
                return_percent: h.return_percent,
            };
        }
    }

    let mut currency_metrics: HashMap<Currency, GroupMetrics> = HashMap::new();
    for h in holdings {
        let group = currency_metrics.entry(h.holding.currency).or_default();
        group.invested += h.invested_value_reporting;
        group.current += h.current_value_reporting;
    }
    finalize_groups(currency_metrics.values_mut(), current_value);

    let mut sector_metrics: HashMap<String, GroupMetrics> = HashMap::new();
    for h in holdings {
        if let Some(sector) = &h.sector {
            let group = sector_metrics.entry(sector.clone()).or_default();
            group.invested += h.invested_value_reporting;
            group.current += h.current_value_reporting;
        }
    }
    finalize_groups(sector_metrics.values_mut(), current_value);

    PortfolioMetrics {
        total_investment,
        current_value,
        total_return,
        percent_return,
        best_performer: best,
        worst_performer: worst,
        currency_metrics,
        sector_metrics,
        exchange_rate: portfolio.exchange_rate,
    }
}

fn finalize_groups<'g>(groups: impl Iterator<Item = &'g mut GroupMetrics>, total_current: f64) {
    for group in groups {
        group.return_value = group.current - group.invested;
        group.return_percent = if group.invested > 0.0 {
            group.return_value / group.invested * 100.0
        } else {
            0.0
        };
        group.share_percent = if total_current > 0.0 {
            group.current / total_current * 100.0
        } else {
            0.0
        };
    }
}
