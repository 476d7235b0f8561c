//! In-memory stand-ins for the upstream services, used by unit tests

use crate::error::ChatError;
use crate::llm::ChatModel;
use crate::models::{
    Message, ModelReply, NewsItem, PriceBar, PriceSeries, RateTable, SymbolInfo, ToolCall,
    ToolDeclaration,
};
use crate::sources::{MarketDataSource, NewsSource, RateSource};
use crate::Result;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn bar(y: i32, m: u32, d: u32, close: f64, high: f64, low: f64, volume: u64) -> PriceBar {
    PriceBar {
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        high,
        low,
        close,
        volume,
    }
}

pub fn article(published_at: &str, source: &str, title: Option<&str>, url: &str) -> NewsItem {
    NewsItem {
        published_at: published_at.to_string(),
        source: source.to_string(),
        title: title.map(str::to_string),
        url: url.to_string(),
    }
}

fn unavailable(service: &str) -> ChatError {
    ChatError::DataError(format!("{} unavailable", service))
}

// =============================
// Market data
// =============================

#[derive(Default)]
pub struct FakeMarket {
    symbols: HashMap<String, Option<String>>,
    aliases: HashMap<String, String>,
    histories: HashMap<String, Vec<PriceBar>>,
    failing: bool,
    lookups: AtomicUsize,
    searches: AtomicUsize,
    history_requests: AtomicUsize,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: &str, short_name: &str) -> Self {
        self.symbols
            .insert(symbol.to_string(), Some(short_name.to_string()));
        self
    }

    /// A listed symbol whose metadata carries no short name
    pub fn with_unnamed_symbol(mut self, symbol: &str) -> Self {
        self.symbols.insert(symbol.to_string(), None);
        self
    }

    pub fn with_alias(mut self, query: &str, symbol: &str) -> Self {
        self.aliases.insert(query.to_string(), symbol.to_string());
        self
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.histories.insert(symbol.to_string(), bars);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for FakeMarket {
    async fn lookup_symbol(&self, query: &str) -> Result<Option<SymbolInfo>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(unavailable("market"));
        }
        Ok(self.symbols.get(query).map(|name| SymbolInfo {
            symbol: query.to_string(),
            short_name: name.clone(),
        }))
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<String>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(unavailable("market"));
        }
        Ok(self.aliases.get(query).cloned().into_iter().collect())
    }

    async fn daily_history(&self, symbol: &str, _days: u32) -> Result<PriceSeries> {
        self.history_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(unavailable("market"));
        }
        Ok(PriceSeries {
            symbol: symbol.to_string(),
            short_name: self.symbols.get(symbol).cloned().flatten(),
            bars: self.histories.get(symbol).cloned().unwrap_or_default(),
        })
    }
}

// =============================
// News
// =============================

#[derive(Default)]
pub struct FakeNews {
    articles: HashMap<String, Vec<NewsItem>>,
    status: Option<u16>,
    queries: Mutex<Vec<String>>,
}

impl FakeNews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(mut self, query: &str, items: Vec<NewsItem>) -> Self {
        self.articles.insert(query.to_string(), items);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NewsSource for FakeNews {
    async fn latest(&self, query: &str, page_size: u32) -> Result<Vec<NewsItem>> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(status) = self.status {
            return Err(ChatError::UpstreamStatus {
                service: "newsapi.org",
                status,
            });
        }
        Ok(self
            .articles
            .get(query)
            .map(|items| items.iter().take(page_size as usize).cloned().collect())
            .unwrap_or_default())
    }
}

// =============================
// Exchange rates
// =============================

pub struct FakeRates {
    rates: HashMap<String, f64>,
    timestamp: i64,
    status: Option<u16>,
    requests: AtomicUsize,
}

impl FakeRates {
    pub fn new(rates: &[(&str, f64)], timestamp: i64) -> Self {
        Self {
            rates: rates.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            timestamp,
            status: None,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn table(&self) -> RateTable {
        RateTable {
            base: Some("USD".to_string()),
            rates: self.rates.clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RateSource for FakeRates {
    async fn latest_rates(&self) -> Result<RateTable> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => Err(ChatError::UpstreamStatus {
                service: "Open Exchange Rates",
                status,
            }),
            None => Ok(self.table()),
        }
    }
}

// =============================
// Model
// =============================

/// One recorded model request
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub transcript: Vec<Message>,
    pub offered_tools: Vec<&'static str>,
}

/// Replays canned replies in order and records every request
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(ModelReply::Answer(text.to_string())));
        self
    }

    pub fn call(self, name: &str, arguments: serde_json::Value) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(ModelReply::ToolCall(ToolCall {
                name: name.to_string(),
                arguments,
            })));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ChatError::ModelError(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedModel {
    async fn decide(
        &self,
        transcript: &[Message],
        tools: Option<&[ToolDeclaration]>,
    ) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(ModelRequest {
            transcript: transcript.to_vec(),
            offered_tools: tools
                .map(|t| t.iter().map(|d| d.name).collect())
                .unwrap_or_default(),
        });

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::ModelError("script exhausted".to_string())))
    }
}
