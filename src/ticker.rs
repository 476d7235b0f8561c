//! Ticker resolution
//!
//! Maps free text ("Apple", "aapl", "Tesla Inc") to a ticker symbol.
//! Never fails: whatever goes wrong, the caller gets the original text back.

use crate::cache::TtlCache;
use crate::sources::MarketDataSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const RESOLVE_TTL: Duration = Duration::from_secs(600);

pub struct TickerResolver {
    source: Arc<dyn MarketDataSource>,
    cache: TtlCache<String, String>,
}

impl TickerResolver {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            cache: TtlCache::new(RESOLVE_TTL),
        }
    }

    /// Best-guess ticker for `query`, or `query` itself.
    pub async fn resolve(&self, query: &str) -> String {
        if let Some(hit) = self.cache.get(&query.to_string()).await {
            return hit;
        }

        let ticker = self.lookup(query).await;
        self.cache.insert(query.to_string(), ticker.clone()).await;
        ticker
    }

    /// Short name of the resolved security, if the market knows one.
    pub async fn short_name(&self, query: &str) -> crate::Result<Option<String>> {
        let ticker = self.resolve(query).await;
        let info = self.source.lookup_symbol(&ticker).await?;
        Ok(info.and_then(|i| i.short_name))
    }

    async fn lookup(&self, query: &str) -> String {
        match self.source.lookup_symbol(query).await {
            Ok(Some(info)) => return info.symbol,
            Ok(None) => {}
            Err(e) => {
                debug!(query = %query, error = %e, "Direct symbol lookup failed");
                return query.to_string();
            }
        }

        match self.source.search_symbols(query).await {
            Ok(symbols) => match symbols.into_iter().next() {
                Some(symbol) => symbol,
                None => {
                    debug!(query = %query, "No symbol match, using input as ticker");
                    query.to_string()
                }
            },
            Err(e) => {
                debug!(query = %query, error = %e, "Symbol search failed");
                query.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMarket;

    #[tokio::test]
    async fn test_direct_lookup_wins() {
        let market = Arc::new(FakeMarket::new().with_symbol("AAPL", "Apple Inc."));
        let resolver = TickerResolver::new(market.clone());

        assert_eq!(resolver.resolve("AAPL").await, "AAPL");
        assert_eq!(market.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_search_then_raw_input() {
        let market = Arc::new(
            FakeMarket::new()
                .with_symbol("TSLA", "Tesla, Inc.")
                .with_alias("Tesla", "TSLA"),
        );
        let resolver = TickerResolver::new(market.clone());

        assert_eq!(resolver.resolve("Tesla").await, "TSLA");
        assert_eq!(resolver.resolve("Nonexistent Corp").await, "Nonexistent Corp");
    }

    #[tokio::test]
    async fn test_lookup_error_returns_query() {
        let market = Arc::new(FakeMarket::new().failing());
        let resolver = TickerResolver::new(market);

        assert_eq!(resolver.resolve("Apple").await, "Apple");
    }

    #[tokio::test]
    async fn test_repeated_query_is_cached() {
        let market = Arc::new(FakeMarket::new().with_alias("Apple", "AAPL"));
        let resolver = TickerResolver::new(market.clone());

        assert_eq!(resolver.resolve("Apple").await, "AAPL");
        assert_eq!(resolver.resolve("Apple").await, "AAPL");
        assert_eq!(market.lookup_calls(), 1);
        assert_eq!(market.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_short_name() {
        let market = Arc::new(
            FakeMarket::new()
                .with_symbol("SAP", "SAP SE")
                .with_unnamed_symbol("TSLA")
                .with_alias("Tesla", "TSLA"),
        );
        let resolver = TickerResolver::new(market);

        assert_eq!(resolver.short_name("SAP").await.unwrap().as_deref(), Some("SAP SE"));
        assert_eq!(resolver.short_name("Tesla").await.unwrap(), None);
        assert_eq!(resolver.short_name("Unknown Co").await.unwrap(), None);
    }
}
