//! TTL caching decorators in front of the market data providers.
//!
//! Quotes and exchange rates live in separate cache domains with separate
//! freshness windows. The caches are shared handles, so a warm cache
//! survives across valuation passes within one session.

use crate::core::cache::TtlCache;
use crate::core::currency::{Currency, CurrencyRateProvider, ExchangeRate};
use crate::core::price::{PriceQuote, QuoteProvider};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

pub struct CachingQuoteProvider<T: QuoteProvider> {
    inner: T,
    cache: Arc<TtlCache<String, PriceQuote>>,
    ttl: Duration,
}

impl<T: QuoteProvider> CachingQuoteProvider<T> {
    pub fn new(inner: T, cache: Arc<TtlCache<String, PriceQuote>>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl<T: QuoteProvider + Send + Sync> QuoteProvider for CachingQuoteProvider<T> {
    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
        self.cache
            .get_or_fetch(symbol.to_string(), self.ttl, || {
                self.inner.fetch_quote(symbol)
            })
            .await
    }
}

pub struct CachingRateProvider<T: CurrencyRateProvider> {
    inner: T,
    cache: Arc<TtlCache<String, ExchangeRate>>,
    ttl: Duration,
}

impl<T: CurrencyRateProvider> CachingRateProvider<T> {
    pub fn new(inner: T, cache: Arc<TtlCache<String, ExchangeRate>>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl<T: CurrencyRateProvider + Send + Sync> CurrencyRateProvider for CachingRateProvider<T> {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate> {
        let key = format!("{from}-{to}");
        self.cache
            .get_or_fetch(key, self.ttl, || self.inner.get_rate(from, to))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{Clock, TtlCache};
    use anyhow::anyhow;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockQuoteProvider {
        call_count: AtomicUsize,
    }

    impl MockQuoteProvider {
        fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl<'a> QuoteProvider for &'a MockQuoteProvider {
        async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if symbol == "PETR4.SA" {
                Ok(PriceQuote {
                    price: 25.0,
                    currency: Currency::Brl,
                    fetched_at: Utc::now(),
                })
            } else {
                Err(anyhow!("Unknown symbol"))
            }
        }
    }

    struct MockRateProvider {
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl<'a> CurrencyRateProvider for &'a MockRateProvider {
        async fn get_rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(ExchangeRate {
                from,
                to,
                rate: 5.0,
                fetched_at: Utc::now(),
            })
        }
    }

    struct FakeClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        fn advance(&self, d: Duration) {
            *self.now.lock().unwrap() += d;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_caching_quote_provider() {
        let inner = MockQuoteProvider::new();
        let cache = Arc::new(TtlCache::new());
        let provider = CachingQuoteProvider::new(&inner, cache, Duration::seconds(300));

        let first = provider.fetch_quote("PETR4.SA").await.unwrap();
        assert_eq!(first.price, 25.0);
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 1);

        let second = provider.fetch_quote("PETR4.SA").await.unwrap();
        assert_eq!(second.price, 25.0);
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 1);

        // Failures are not cached; each call reaches the inner provider.
        let _ = provider.fetch_quote("MISSING").await;
        let _ = provider.fetch_quote("MISSING").await;
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_quote_refetched_after_ttl() {
        let inner = MockQuoteProvider::new();
        let clock = Arc::new(FakeClock::new());
        let cache = Arc::new(TtlCache::with_clock(clock.clone()));
        let provider = CachingQuoteProvider::new(&inner, cache, Duration::seconds(300));

        let _ = provider.fetch_quote("PETR4.SA").await.unwrap();
        clock.advance(Duration::seconds(301));
        let _ = provider.fetch_quote("PETR4.SA").await.unwrap();
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_rate_provider() {
        let inner = MockRateProvider {
            call_count: AtomicUsize::new(0),
        };
        let cache = Arc::new(TtlCache::new());
        let provider = CachingRateProvider::new(&inner, cache, Duration::seconds(3600));

        let first = provider.get_rate(Currency::Usd, Currency::Brl).await.unwrap();
        assert_eq!(first.rate, 5.0);
        let _ = provider.get_rate(Currency::Usd, Currency::Brl).await.unwrap();
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 1);

        // The reverse direction is a distinct cache key.
        let _ = provider.get_rate(Currency::Brl, Currency::Usd).await.unwrap();
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 2);
    }
}
