//! Yahoo Finance chart and search endpoints

use super::MarketDataSource;
use crate::error::ChatError;
use crate::models::{PriceBar, PriceSeries, SymbolInfo};
use crate::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

pub struct YahooFinanceSource {
    client: Client,
    base_url: String,
}

impl YahooFinanceSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn chart(&self, symbol: &str, query: &[(&str, String)]) -> Result<Option<ChartResult>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!(url = %url, "Yahoo Finance chart");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        // Unknown symbols come back as 404 with an error body.
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ChatError::UpstreamStatus {
                service: "Yahoo Finance",
                status: status.as_u16(),
            });
        }

        let body: ChartResponse = response.json().await?;
        Ok(body.chart.result.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.swap_remove(0))
            }
        }))
    }
}

#[async_trait::async_trait]
impl MarketDataSource for YahooFinanceSource {
    async fn lookup_symbol(&self, query: &str) -> Result<Option<SymbolInfo>> {
        let query = query.trim();
        if query.is_empty() || query.contains(char::is_whitespace) {
            return Ok(None);
        }

        let result = self
            .chart(query, &[("range", "1d".to_string()), ("interval", "1d".to_string())])
            .await?;

        Ok(result.and_then(|r| {
            r.meta.symbol.map(|symbol| SymbolInfo {
                symbol,
                short_name: r.meta.short_name.or(r.meta.long_name),
            })
        }))
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<String>> {
        let url = format!("{}/v1/finance/search", self.base_url);
        debug!(url = %url, query = %query, "Yahoo Finance search");

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("quotesCount", "5"), ("newsCount", "0")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::UpstreamStatus {
                service: "Yahoo Finance search",
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .quotes
            .into_iter()
            .filter_map(|q| q.symbol)
            .collect())
    }

    async fn daily_history(&self, symbol: &str, days: u32) -> Result<PriceSeries> {
        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(days));

        let result = self
            .chart(
                symbol,
                &[
                    ("period1", start.timestamp().to_string()),
                    ("period2", end.timestamp().to_string()),
                    ("interval", "1d".to_string()),
                ],
            )
            .await?;

        match result {
            Some(result) => Ok(result.into_series(symbol)),
            None => Ok(PriceSeries {
                symbol: symbol.to_string(),
                short_name: None,
                bars: Vec::new(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    short_name: Option<String>,
    long_name: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: Option<String>,
}

impl ChartResult {
    fn into_series(self, requested: &str) -> PriceSeries {
        let offset = self.meta.gmtoffset;
        let columns = self.indicators.quote.into_iter().next().unwrap_or_default();

        let bars = self
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                // Rows without a close are market holidays or partial days.
                let close = columns.close.get(i).copied().flatten()?;
                let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
                Some(PriceBar {
                    date,
                    high: columns.high.get(i).copied().flatten().unwrap_or(close),
                    low: columns.low.get(i).copied().flatten().unwrap_or(close),
                    close,
                    volume: columns
                        .volume
                        .get(i)
                        .copied()
                        .flatten()
                        .map(|v| v.max(0.0) as u64)
                        .unwrap_or(0),
                })
            })
            .collect();

        PriceSeries {
            symbol: self.meta.symbol.unwrap_or_else(|| requested.to_string()),
            short_name: self.meta.short_name.or(self.meta.long_name),
            bars,
        }
    }
}
