//! Best-effort descriptive metadata lookup (sector, display name, market).
//!
//! Fetches are independent and I/O bound, so missing tickers are resolved
//! through a bounded concurrent pool. A failed ticker is skipped; it never
//! affects its siblings or the valuation pass running alongside.

use crate::core::cache::TtlCache;
use crate::core::info::{AssetInfo, InfoProvider};
use chrono::Duration;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on in-flight metadata fetches.
const MAX_CONCURRENT_FETCHES: usize = 5;

/// Descriptive data moves slowly; cache entries stay valid for a day.
fn info_ttl() -> Duration {
    Duration::hours(24)
}

pub struct EnrichmentService {
    provider: Arc<dyn InfoProvider>,
    cache: Arc<TtlCache<String, AssetInfo>>,
}

impl EnrichmentService {
    pub fn new(provider: Arc<dyn InfoProvider>, cache: Arc<TtlCache<String, AssetInfo>>) -> Self {
        EnrichmentService { provider, cache }
    }

    /// Resolve metadata for every ticker, fetching only what the cache does
    /// not already hold. Individual failures leave that ticker absent from
    /// the result.
    pub async fn enrich(&self, tickers: &[String]) -> HashMap<String, AssetInfo> {
        let mut results = HashMap::new();
        let mut missing = Vec::new();

        for ticker in tickers {
            if results.contains_key(ticker) || missing.contains(ticker) {
                continue;
            }
            match self.cache.get(ticker, info_ttl()).await {
                Some(info) => {
                    results.insert(ticker.clone(), info);
                }
                None => missing.push(ticker.clone()),
            }
        }

        if missing.is_empty() {
            return results;
        }
        debug!("Fetching metadata for {} tickers", missing.len());

        let fetches = stream::iter(missing.into_iter().map(|ticker| {
            let provider = Arc::clone(&self.provider);
            async move {
                let outcome = provider.fetch_info(&ticker).await;
                (ticker, outcome)
            }
        }))
        .buffer_unordered(MAX_CONCURRENT_FETCHES)
        .collect::<Vec<_>>()
        .await;

        for (ticker, outcome) in fetches {
            match outcome {
                Ok(info) => {
                    self.cache.put(ticker.clone(), info.clone()).await;
                    results.insert(ticker, info);
                }
                Err(e) => {
                    debug!("Metadata fetch failed for {ticker}: {e}");
                }
            }
        }

        results
    }
}
