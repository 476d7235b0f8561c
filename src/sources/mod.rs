//! Third-party data sources
//!
//! Each trait is the seam between a client (which formats and caches) and the
//! HTTP service behind it. Implementations return `ChatError::UpstreamStatus`
//! for non-success responses so callers can quote the status code.

use crate::models::{NewsItem, PriceSeries, RateTable, SymbolInfo};
use crate::Result;
use reqwest::Client;
use std::time::Duration;

pub mod newsapi;
pub mod openexchange;
pub mod yahoo;

pub use newsapi::NewsApiSource;
pub use openexchange::OpenExchangeSource;
pub use yahoo::YahooFinanceSource;

/// Price and symbol metadata provider
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Direct lookup of `query` as a symbol. `Ok(None)` if it is not one.
    async fn lookup_symbol(&self, query: &str) -> Result<Option<SymbolInfo>>;

    /// Fuzzy search by name or alias, best match first
    async fn search_symbols(&self, query: &str) -> Result<Vec<String>>;

    /// Daily bars covering the trailing `days` calendar days, oldest first
    async fn daily_history(&self, symbol: &str, days: u32) -> Result<PriceSeries>;
}

/// Article search provider
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Most recent articles for `query`, newest first, at most `page_size`
    async fn latest(&self, query: &str, page_size: u32) -> Result<Vec<NewsItem>>;
}

/// Exchange-rate table provider
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    async fn latest_rates(&self) -> Result<RateTable>;
}

/// Shared, connection-pooled HTTP client for all sources
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (compatible; finance-chat)")
        .build()?;

    Ok(client)
}
