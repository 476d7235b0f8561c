//! Currency conversion from a shared base-currency rate table

use crate::cache::TtlCache;
use crate::error::ChatError;
use crate::format;
use crate::models::{FailureReason, RateTable, ToolOutcome};
use crate::sources::RateSource;
use chrono::DateTime;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const FX_TTL: Duration = Duration::from_secs(300);

pub const PAIR_NOT_FOUND: &str = "The currency pair could not be found.";

pub struct FxClient {
    source: Arc<dyn RateSource>,
    cache: TtlCache<(String, String), ToolOutcome>,
}

impl FxClient {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            cache: TtlCache::new(FX_TTL),
        }
    }

    /// Value of one unit of `from_currency` in `to_currency`
    pub async fn rate(&self, from_currency: &str, to_currency: &str) -> ToolOutcome {
        let key = (
            from_currency.trim().to_uppercase(),
            to_currency.trim().to_uppercase(),
        );

        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        let outcome = self.fetch(&key.0, &key.1).await;
        self.cache.insert(key, outcome.clone()).await;
        outcome
    }

    async fn fetch(&self, from: &str, to: &str) -> ToolOutcome {
        info!(from = %from, to = %to, "Fetching exchange rate");

        match self.source.latest_rates().await {
            Ok(table) => format_rate(&table, from, to),
            Err(ChatError::UpstreamStatus { status, .. }) => ToolOutcome::failure(
                FailureReason::UpstreamStatus(status),
                format!("Error while retrieving exchange rate (Status {}).", status),
            ),
            Err(e) => {
                warn!(error = %e, "Exchange rate lookup failed");
                ToolOutcome::failure(
                    FailureReason::Unexpected,
                    format!("Error while retrieving exchange rate: {}.", e),
                )
            }
        }
    }
}

/// `rates[to] / rates[from]`, rounded to 4 decimals
pub fn cross_rate(table: &RateTable, from: &str, to: &str) -> Option<f64> {
    let rate_from = *table.rates.get(from)?;
    let rate_to = *table.rates.get(to)?;
    if rate_from == 0.0 {
        return None;
    }

    let rate = rate_to / rate_from;
    if rate.is_finite() {
        Some(format::round_to(rate, 4))
    } else {
        None
    }
}

fn format_rate(table: &RateTable, from: &str, to: &str) -> ToolOutcome {
    let Some(rate) = cross_rate(table, from, to) else {
        return ToolOutcome::failure(FailureReason::PairNotFound, PAIR_NOT_FOUND);
    };

    let as_of = DateTime::from_timestamp(table.timestamp, 0)
        .map(|dt| format::date_time(&dt))
        .unwrap_or_default();

    ToolOutcome::success(format!(
        "1 {} = **{} {}**\n_Source: Open Exchange Rates, as of {} UTC_",
        from,
        format::decimal(rate),
        to,
        as_of
    ))
}
