use crate::core::classify::Market;
use anyhow::Result;
use async_trait::async_trait;

/// Descriptive metadata for one ticker, fetched best-effort.
#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub sector: Option<String>,
    pub display_name: Option<String>,
    pub market: Market,
}

#[async_trait]
pub trait InfoProvider: Send + Sync {
    async fn fetch_info(&self, ticker: &str) -> Result<AssetInfo>;
}
