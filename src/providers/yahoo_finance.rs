//! Yahoo Finance providers: quotes, exchange rates and descriptive info.
//!
//! All provider quirks live here: the chart endpoint for daily closes, the
//! ordered fallback over instantaneous quote fields when a close is missing,
//! the `{FROM}{TO}=X` synthetic symbols for currency pairs, and the
//! quoteSummary modules for sector/name metadata.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::core::classify::{classify, Market};
use crate::core::currency::{Currency, CurrencyRateProvider, ExchangeRate};
use crate::core::info::{AssetInfo, InfoProvider};
use crate::core::price::{PriceQuote, QuoteProvider};

const USER_AGENT: &str = "carteira/0.1";

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

// Chart endpoint response (daily closes).
#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    currency: Option<String>,
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<IndicatorQuote>,
}

#[derive(Deserialize, Debug)]
struct IndicatorQuote {
    close: Option<Vec<Option<f64>>>,
}

// Quote endpoint response (instantaneous fields, fallback path).
#[derive(Deserialize, Debug)]
struct QuoteResponse {
    #[serde(alias = "quoteResponse")]
    quote_response: QuoteResult,
}

#[derive(Deserialize, Debug)]
struct QuoteResult {
    result: Vec<QuoteFields>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteFields {
    #[serde(alias = "currentPrice")]
    current_price: Option<f64>,
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "regularMarketPreviousClose", alias = "previousClose")]
    previous_close: Option<f64>,
    #[serde(alias = "regularMarketOpen")]
    open: Option<f64>,
    #[serde(alias = "regularMarketDayHigh", alias = "dayHigh")]
    day_high: Option<f64>,
    ask: Option<f64>,
    currency: Option<String>,
}

type PriceExtractor = (&'static str, fn(&QuoteFields) -> Option<f64>);

/// Ordered fallback over instantaneous price fields; the first strictly
/// positive value wins.
const PRICE_EXTRACTORS: &[PriceExtractor] = &[
    ("currentPrice", |q| q.current_price),
    ("regularMarketPrice", |q| q.regular_market_price),
    ("previousClose", |q| q.previous_close),
    ("open", |q| q.open),
    ("dayHigh", |q| q.day_high),
    ("ask", |q| q.ask),
];

fn first_positive_price(fields: &QuoteFields) -> Option<(&'static str, f64)> {
    PRICE_EXTRACTORS.iter().find_map(|(name, extract)| {
        extract(fields).filter(|p| *p > 0.0).map(|p| (*name, p))
    })
}

/// Most recent non-null positive close, if the chart carries any bars.
fn latest_close(item: &ChartItem) -> Option<f64> {
    item.indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref())
        .and_then(|closes| closes.iter().rev().find_map(|c| *c))
        .filter(|p| *p > 0.0)
}

fn parse_currency(raw: Option<&str>, symbol: &str) -> Result<Currency> {
    let code = raw.ok_or_else(|| anyhow!("No currency reported for symbol: {}", symbol))?;
    Currency::from_str(code)
        .map_err(|_| anyhow!("Unsupported quote currency {} for symbol: {}", code, symbol))
}

pub struct YahooQuoteProvider {
    base_url: String,
}

impl YahooQuoteProvider {
    pub fn new(base_url: &str) -> Self {
        YahooQuoteProvider {
            base_url: base_url.to_string(),
        }
    }

    async fn fetch_daily_close(&self, symbol: &str) -> Result<Option<PriceQuote>> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, symbol
        );
        debug!("Requesting chart data from {}", url);

        let response = http_client()?
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        let data = response.json::<ChartResponse>().await?;
        let item = match data.chart.result.first() {
            Some(item) => item,
            None => return Ok(None),
        };

        let price = match latest_close(item).or(item.meta.regular_market_price) {
            Some(price) if price > 0.0 => price,
            _ => return Ok(None),
        };
        let currency = parse_currency(item.meta.currency.as_deref(), symbol)?;

        Ok(Some(PriceQuote {
            price,
            currency,
            fetched_at: Utc::now(),
        }))
    }

    async fn fetch_from_quote_fields(&self, symbol: &str) -> Result<PriceQuote> {
        let url = format!("{}/v7/finance/quote?symbols={}", self.base_url, symbol);
        debug!("Requesting quote fields from {}", url);

        let response = http_client()?
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        let data = response.json::<QuoteResponse>().await?;
        let fields = data
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No quote data found for symbol: {}", symbol))?;

        let (field, price) = first_positive_price(&fields)
            .ok_or_else(|| anyhow!("No usable price field for symbol: {}", symbol))?;
        debug!("Using fallback price field {} for {}", field, symbol);

        let currency = parse_currency(fields.currency.as_deref(), symbol)?;

        Ok(PriceQuote {
            price,
            currency,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    #[instrument(name = "YahooQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
        match self.fetch_daily_close(symbol).await {
            Ok(Some(quote)) => return Ok(quote),
            Ok(None) => debug!("No daily close for {}, trying quote fields", symbol),
            Err(e) => debug!("Chart lookup failed for {}: {}", symbol, e),
        }
        self.fetch_from_quote_fields(symbol).await
    }
}

pub struct YahooCurrencyProvider {
    base_url: String,
}

impl YahooCurrencyProvider {
    pub fn new(base_url: &str) -> Self {
        YahooCurrencyProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyChartResponse {
    chart: CurrencyChartResult,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartResult {
    result: Vec<CurrencyChartItem>,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartItem {
    meta: CurrencyChartMeta,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate> {
        let symbol = format!("{from}{to}=X");
        let url = format!("{}/v8/finance/chart/{symbol}", self.base_url);
        debug!("Requesting currency rate from {}", url);

        let response = http_client()?
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: CurrencyChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", symbol))?;

        Ok(ExchangeRate {
            from,
            to,
            rate: item.meta.regular_market_price,
            fetched_at: Utc::now(),
        })
    }
}

pub struct YahooInfoProvider {
    base_url: String,
}

impl YahooInfoProvider {
    pub fn new(base_url: &str) -> Self {
        YahooInfoProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(alias = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryItem {
    #[serde(alias = "assetProfile")]
    asset_profile: Option<AssetProfile>,
    #[serde(alias = "quoteType")]
    quote_type: Option<QuoteType>,
}

#[derive(Deserialize, Debug)]
struct AssetProfile {
    sector: Option<String>,
    #[serde(alias = "industryDisp")]
    industry_disp: Option<String>,
}

#[derive(Deserialize, Debug)]
struct QuoteType {
    #[serde(alias = "shortName")]
    short_name: Option<String>,
    #[serde(alias = "longName")]
    long_name: Option<String>,
}

#[async_trait]
impl InfoProvider for YahooInfoProvider {
    #[instrument(name = "YahooInfoFetch", skip(self), fields(ticker = %ticker))]
    async fn fetch_info(&self, ticker: &str) -> Result<AssetInfo> {
        // Depositary receipts carry no metadata of their own; the classifier
        // redirects the lookup to the underlying foreign ticker.
        let classification = classify(ticker);
        if classification.market == Market::DepositaryReceipt {
            debug!(
                "Redirecting info lookup for {} to underlying {}",
                ticker, classification.lookup_symbol
            );
        }

        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile,quoteType",
            self.base_url, classification.lookup_symbol
        );
        debug!("Requesting descriptive info from {}", url);

        let response = http_client()?
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for ticker: {}", e, ticker))?;

        let data = response.json::<QuoteSummaryResponse>().await?;
        let item = data
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No descriptive data found for ticker: {}", ticker))?;

        let sector = item
            .asset_profile
            .and_then(|p| p.sector.or(p.industry_disp));
        let display_name = item
            .quote_type
            .and_then(|q| q.short_name.or(q.long_name));

        Ok(AssetInfo {
            sector,
            display_name,
            market: classification.market,
        })
    }
}
