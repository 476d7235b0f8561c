//! Company news lookup

use crate::cache::TtlCache;
use crate::error::ChatError;
use crate::format;
use crate::models::{FailureReason, NewsItem, ToolOutcome};
use crate::sources::NewsSource;
use crate::ticker::TickerResolver;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const NEWS_TTL: Duration = Duration::from_secs(120);
pub const NEWS_PAGE_SIZE: u32 = 5;

pub struct NewsClient {
    source: Arc<dyn NewsSource>,
    resolver: Arc<TickerResolver>,
    cache: TtlCache<String, ToolOutcome>,
}

impl NewsClient {
    pub fn new(source: Arc<dyn NewsSource>, resolver: Arc<TickerResolver>) -> Self {
        Self {
            source,
            resolver,
            cache: TtlCache::new(NEWS_TTL),
        }
    }

    /// Up to five most recent articles about the company
    pub async fn news(&self, ticker_or_name: &str) -> ToolOutcome {
        if let Some(hit) = self.cache.get(&ticker_or_name.to_string()).await {
            return hit;
        }

        let outcome = self.fetch(ticker_or_name).await;
        self.cache
            .insert(ticker_or_name.to_string(), outcome.clone())
            .await;
        outcome
    }

    async fn fetch(&self, ticker_or_name: &str) -> ToolOutcome {
        let name = match self.resolver.short_name(ticker_or_name).await {
            Ok(Some(name)) => name,
            Ok(None) | Err(_) => ticker_or_name.to_string(),
        };
        info!(query = %ticker_or_name, name = %name, "Fetching news");

        match self.source.latest(&name, NEWS_PAGE_SIZE).await {
            Ok(items) if items.is_empty() => {
                ToolOutcome::notice(format!("No recent news found for **{}**.", name))
            }
            Ok(items) => ToolOutcome::success(format_articles(&items, Local::now())),
            Err(ChatError::UpstreamStatus { status, .. }) => ToolOutcome::failure(
                FailureReason::UpstreamStatus(status),
                format!("Error while retrieving news (Status {}).", status),
            ),
            Err(e) => {
                warn!(name = %name, error = %e, "News lookup failed");
                ToolOutcome::failure(
                    FailureReason::Unexpected,
                    format!("Error while retrieving news: {}.", e),
                )
            }
        }
    }
}

fn format_articles(items: &[NewsItem], retrieved_at: DateTime<Local>) -> String {
    let mut out = String::new();

    for item in items.iter().take(NEWS_PAGE_SIZE as usize) {
        out.push_str(&format!(
            "- {} ({}): [{}]({})\n",
            published_label(&item.published_at),
            item.source,
            item.title.as_deref().unwrap_or("No title"),
            item.url
        ));
    }

    out.push_str(&format!(
        "\n_Source: newsapi.org, as of {}_",
        format::date_time(&retrieved_at)
    ));
    out
}

/// `DD.MM.YYYY HH:MM`, or the first 10 characters when unparseable
fn published_label(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => format::date_time(&dt),
        Err(_) => raw.chars().take(10).collect(),
    }
}
