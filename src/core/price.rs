//! Quote abstractions and core types

use crate::core::currency::Currency;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time price observation for one lookup symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub currency: Currency,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch the latest usable price for a provider lookup symbol.
    ///
    /// Failures are recoverable; callers fall back to an estimate and keep
    /// going rather than surface the error.
    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote>;
}
