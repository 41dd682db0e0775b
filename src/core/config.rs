use crate::core::currency::Currency;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::debug;

/// Structural problems in holdings data. The only hard error in the
/// pipeline; everything downstream degrades instead of failing.
#[derive(Debug, Error, PartialEq)]
pub enum HoldingError {
    #[error("holding has an empty ticker")]
    EmptyTicker,
    #[error("holding {ticker}: quantity must be positive")]
    ZeroQuantity { ticker: String },
    #[error("holding {ticker}: average cost {average_cost} must not be negative")]
    NegativeCost { ticker: String, average_cost: f64 },
    #[error("holding {ticker}: average cost is not a number")]
    NonFiniteCost { ticker: String },
}

/// One validated portfolio row. Ticker is uppercased and trimmed; numeric
/// invariants are enforced by the constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHolding")]
pub struct Holding {
    pub ticker: String,
    pub average_cost: f64,
    pub quantity: u32,
    pub currency: Currency,
}

impl Holding {
    pub fn new(
        ticker: &str,
        average_cost: f64,
        quantity: u32,
        currency: Currency,
    ) -> Result<Self, HoldingError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(HoldingError::EmptyTicker);
        }
        if quantity == 0 {
            return Err(HoldingError::ZeroQuantity { ticker });
        }
        if !average_cost.is_finite() {
            return Err(HoldingError::NonFiniteCost { ticker });
        }
        if average_cost < 0.0 {
            return Err(HoldingError::NegativeCost {
                ticker,
                average_cost,
            });
        }
        Ok(Holding {
            ticker,
            average_cost,
            quantity,
            currency,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawHolding {
    ticker: String,
    average_cost: f64,
    quantity: u32,
    #[serde(default = "default_currency")]
    currency: Currency,
}

fn default_currency() -> Currency {
    Currency::Brl
}

impl TryFrom<RawHolding> for Holding {
    type Error = HoldingError;

    fn try_from(raw: RawHolding) -> Result<Self, Self::Error> {
        Holding::new(&raw.ticker, raw.average_cost, raw.quantity, raw.currency)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    pub quote_ttl_secs: i64,
    pub rate_ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            quote_ttl_secs: 300,
            rate_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("app", "carteira", "carteira")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
