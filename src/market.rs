//! Stock price lookups
//!
//! Every public operation resolves the ticker first and never returns an
//! error: empty data and retrieval failures become failure outcomes.

use crate::config::SUPPORT_PHONE_NUMBER;
use crate::format;
use crate::models::{
    ChartPoint, FailureReason, PriceChart, PriceSeries, PriceSnapshot, ToolOutcome,
};
use crate::sources::MarketDataSource;
use crate::ticker::TickerResolver;
use std::sync::Arc;
use tracing::{info, warn};

/// Trailing window for every price lookup, in calendar days
pub const HISTORY_DAYS: u32 = 7;

pub const NO_PRICE_DATA: &str =
    "Could not find any price data. Please check the ticker symbol or company name.";
pub const NO_HISTORY_DATA: &str = "No stock data available for this company.";
pub const NO_CHART_DATA: &str = "No price data available.";
pub const CHART_FAILED: &str = "Error while creating the chart.";

/// Result of preparing a chart for display
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Chart(PriceChart),
    Warning(String),
    Error(String),
}

pub struct MarketDataClient {
    source: Arc<dyn MarketDataSource>,
    resolver: Arc<TickerResolver>,
}

impl MarketDataClient {
    pub fn new(source: Arc<dyn MarketDataSource>, resolver: Arc<TickerResolver>) -> Self {
        Self { source, resolver }
    }

    /// Latest close, high, low and volume with a source footer
    pub async fn current_price(&self, ticker_or_name: &str) -> ToolOutcome {
        let ticker = self.resolver.resolve(ticker_or_name).await;
        info!(query = %ticker_or_name, ticker = %ticker, "Fetching current price");

        let series = match self.source.daily_history(&ticker, HISTORY_DAYS).await {
            Ok(series) => series,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Price lookup failed");
                return ToolOutcome::failure(
                    FailureReason::Unexpected,
                    format!(
                        "Error while retrieving stock data: {}. Please contact support: {}",
                        e, SUPPORT_PHONE_NUMBER
                    ),
                );
            }
        };

        match PriceSnapshot::from_series(&series) {
            Some(snapshot) => ToolOutcome::success(format_snapshot(&snapshot, &ticker)),
            None => ToolOutcome::failure(FailureReason::NoData, NO_PRICE_DATA),
        }
    }

    /// Closing prices of the last seven days, newest first
    pub async fn price_history(&self, ticker_or_name: &str) -> ToolOutcome {
        let ticker = self.resolver.resolve(ticker_or_name).await;
        info!(query = %ticker_or_name, ticker = %ticker, "Fetching price history");

        match self.source.daily_history(&ticker, HISTORY_DAYS).await {
            Ok(series) if series.bars.is_empty() => {
                ToolOutcome::failure(FailureReason::NoData, NO_HISTORY_DATA)
            }
            Ok(series) => ToolOutcome::success(format_history(&series, &ticker)),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "History lookup failed");
                ToolOutcome::failure(
                    FailureReason::Unexpected,
                    format!(
                        "Error while retrieving stock history: {}. Please contact support: {}",
                        e, SUPPORT_PHONE_NUMBER
                    ),
                )
            }
        }
    }

    /// Closing-price series for the chart widget
    pub async fn render_chart(&self, ticker_or_name: &str) -> ChartOutcome {
        let ticker = self.resolver.resolve(ticker_or_name).await;

        match self.source.daily_history(&ticker, HISTORY_DAYS).await {
            Ok(series) if series.bars.is_empty() => ChartOutcome::Warning(NO_CHART_DATA.to_string()),
            Ok(series) => ChartOutcome::Chart(PriceChart {
                title: format!("{} – Closing Price (last 7 days)", ticker),
                ticker,
                points: series
                    .bars
                    .iter()
                    .map(|b| ChartPoint {
                        date: b.date,
                        close: b.close,
                    })
                    .collect(),
            }),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Chart data lookup failed");
                ChartOutcome::Error(CHART_FAILED.to_string())
            }
        }
    }
}

fn format_snapshot(snapshot: &PriceSnapshot, ticker: &str) -> String {
    let as_of = format::date(snapshot.as_of);
    format!(
        "**{} ({}) as of {}**\n\
         Closing price: **{} USD**\n\
         High: {} USD, Low: {} USD, Volume: {}\n\n\
         _Source: Yahoo Finance, as of {}_",
        snapshot.name,
        ticker,
        as_of,
        format::decimal(format::round_to(snapshot.close, 2)),
        format::decimal(format::round_to(snapshot.high, 2)),
        format::decimal(format::round_to(snapshot.low, 2)),
        snapshot.volume,
        as_of,
    )
}

fn format_history(series: &PriceSeries, ticker: &str) -> String {
    let mut out = format!(
        "Here is the price history for {} ({}) for the last seven days:\n\n",
        series.display_name(),
        ticker
    );

    let lines: Vec<String> = series
        .bars
        .iter()
        .rev()
        .take(HISTORY_DAYS as usize)
        .map(|b| format!("* **{}: {:.2} USD**", format::date(b.date), b.close))
        .collect();
    out.push_str(&lines.join("\n"));

    out
}
