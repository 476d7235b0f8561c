//! Tool trait and registry
//!
//! The declarations are fixed at start-up and handed to the model verbatim on
//! every turn. Tools never return errors: bad input and upstream trouble come
//! back as failure outcomes the model can narrate.

use crate::fx::FxClient;
use crate::market::MarketDataClient;
use crate::models::{
    FailureReason, ParameterSpec, ParameterType, ToolCall, ToolDeclaration, ToolOutcome,
};
use crate::news::NewsClient;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const GET_STOCK_PRICE: &str = "get_stock_price";
pub const GET_STOCK_HISTORY: &str = "get_stock_history";
pub const GET_FINANCIAL_NEWS: &str = "get_financial_news";
pub const GET_EXCHANGE_RATE: &str = "get_exchange_rate";

fn string_param(name: &'static str, description: &'static str) -> ParameterSpec {
    ParameterSpec {
        name,
        kind: ParameterType::String,
        description,
        required: true,
    }
}

lazy_static! {
    pub static ref TOOL_DECLARATIONS: Vec<ToolDeclaration> = vec![
        ToolDeclaration {
            name: GET_STOCK_PRICE,
            description: "Returns the current stock price for a given ticker symbol or company name.",
            parameters: vec![string_param(
                "ticker",
                "The ticker symbol or company name, e.g., AAPL or Apple.",
            )],
        },
        ToolDeclaration {
            name: GET_STOCK_HISTORY,
            description: "Shows the stock price history (closing prices for the last 7 days) for a given ticker symbol or company.",
            parameters: vec![string_param(
                "ticker",
                "The ticker symbol or company name, e.g., TSLA or Tesla.",
            )],
        },
        ToolDeclaration {
            name: GET_FINANCIAL_NEWS,
            description: "Returns the latest news for a given company or ticker.",
            parameters: vec![string_param(
                "ticker",
                "The ticker symbol or company name, e.g., AAPL or Apple.",
            )],
        },
        ToolDeclaration {
            name: GET_EXCHANGE_RATE,
            description: "Returns the current exchange rate between two currencies.",
            parameters: vec![
                string_param("from_currency", "Base currency, e.g., EUR"),
                string_param("to_currency", "Target currency, e.g., USD"),
            ],
        },
    ];
}

/// A single callable tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, call: &ToolCall) -> ToolOutcome;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn declarations(&self) -> &'static [ToolDeclaration] {
        TOOL_DECLARATIONS.as_slice()
    }

    /// Run the named tool; unknown names yield the "Unknown function call." sentinel.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        match self.get(&call.name) {
            Some(tool) => {
                debug!(tool = %call.name, arguments = %call.arguments, "Dispatching tool");
                tool.execute(call).await
            }
            None => {
                warn!(tool = %call.name, "Model requested an unknown tool");
                ToolOutcome::unknown_tool()
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn require_str<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, ToolOutcome> {
    match call.str_arg(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim()),
        _ => Err(ToolOutcome::failure(
            FailureReason::MissingArgument,
            format!("Missing required argument '{}'.", key),
        )),
    }
}

pub struct StockPriceTool {
    market: Arc<MarketDataClient>,
}

#[async_trait::async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &'static str {
        GET_STOCK_PRICE
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        match require_str(call, "ticker") {
            Ok(ticker) => self.market.current_price(ticker).await,
            Err(outcome) => outcome,
        }
    }
}

pub struct StockHistoryTool {
    market: Arc<MarketDataClient>,
}

#[async_trait::async_trait]
impl Tool for StockHistoryTool {
    fn name(&self) -> &'static str {
        GET_STOCK_HISTORY
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        match require_str(call, "ticker") {
            Ok(ticker) => self.market.price_history(ticker).await,
            Err(outcome) => outcome,
        }
    }
}

pub struct FinancialNewsTool {
    news: Arc<NewsClient>,
}

#[async_trait::async_trait]
impl Tool for FinancialNewsTool {
    fn name(&self) -> &'static str {
        GET_FINANCIAL_NEWS
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        match require_str(call, "ticker") {
            Ok(ticker) => self.news.news(ticker).await,
            Err(outcome) => outcome,
        }
    }
}

pub struct ExchangeRateTool {
    fx: Arc<FxClient>,
}

#[async_trait::async_trait]
impl Tool for ExchangeRateTool {
    fn name(&self) -> &'static str {
        GET_EXCHANGE_RATE
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let from = match require_str(call, "from_currency") {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };
        let to = match require_str(call, "to_currency") {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };
        self.fx.rate(from, to).await
    }
}

/// Registry with the four finance tools wired to their clients.
pub fn create_default_registry(
    market: Arc<MarketDataClient>,
    news: Arc<NewsClient>,
    fx: Arc<FxClient>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(StockPriceTool {
        market: market.clone(),
    }));
    registry.register(Arc::new(StockHistoryTool { market }));
    registry.register(Arc::new(FinancialNewsTool { news }));
    registry.register(Arc::new(ExchangeRateTool { fx }));

    registry
}
