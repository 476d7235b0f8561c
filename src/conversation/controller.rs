//! One user turn
//!
//! USER → MODEL → (ANSWER | TOOL → MODEL) → DISPLAY
//!
//! Tool failures never abort a turn; they are narrated by the model and
//! surfaced as a warning or error next to the answer. Only model errors
//! abort, leaving the user message in the transcript.

use super::session::Session;
use crate::config::Settings;
use crate::fx::FxClient;
use crate::llm::{AzureOpenAiClient, ChatModel};
use crate::market::{ChartOutcome, MarketDataClient};
use crate::models::{Message, ModelReply, Role, ToolCall, ToolOutcome, TurnDisplay};
use crate::news::NewsClient;
use crate::sources::{build_http_client, NewsApiSource, OpenExchangeSource, YahooFinanceSource};
use crate::ticker::TickerResolver;
use crate::tools::{
    create_default_registry, ToolRegistry, GET_EXCHANGE_RATE, GET_FINANCIAL_NEWS,
    GET_STOCK_HISTORY,
};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The tool that ran during a turn
#[derive(Debug, Clone, Serialize)]
pub struct ToolRun {
    pub call: ToolCall,
    pub outcome: ToolOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub answer: String,
    pub tool: Option<ToolRun>,
    pub display: TurnDisplay,
    pub elapsed_ms: u64,
}

pub struct TurnController {
    model: Box<dyn ChatModel>,
    registry: ToolRegistry,
    market: Arc<MarketDataClient>,
}

impl TurnController {
    pub fn new(
        model: Box<dyn ChatModel>,
        registry: ToolRegistry,
        market: Arc<MarketDataClient>,
    ) -> Self {
        Self {
            model,
            registry,
            market,
        }
    }

    /// Wire the live Azure OpenAI model and HTTP data sources from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = build_http_client(settings.http_timeout)?;

        let market_source = Arc::new(YahooFinanceSource::new(
            http.clone(),
            settings.yahoo_base_url.clone(),
        ));
        let resolver = Arc::new(TickerResolver::new(market_source.clone()));
        let market = Arc::new(MarketDataClient::new(market_source, resolver.clone()));

        let news = Arc::new(NewsClient::new(
            Arc::new(NewsApiSource::new(
                http.clone(),
                settings.news_base_url.clone(),
                settings.news_api_key.clone(),
            )),
            resolver,
        ));
        let fx = Arc::new(FxClient::new(Arc::new(OpenExchangeSource::new(
            http.clone(),
            settings.fx_base_url.clone(),
            settings.fx_api_key.clone(),
        ))));

        let registry = create_default_registry(market.clone(), news, fx);
        let model = Box::new(AzureOpenAiClient::new(http, settings.model.clone()));

        info!(deployment = %settings.model.deployment, "Turn controller initialized");
        Ok(Self::new(model, registry, market))
    }

    pub async fn run_turn(&self, session: &mut Session, input: &str) -> Result<TurnReport> {
        let start = Instant::now();
        info!(session_id = %session.session_id, input = %input, "Turn: user input");

        session.push(Message::new(Role::User, input));

        debug!("Turn: awaiting model decision");
        let reply = self
            .model
            .decide(session.messages(), Some(self.registry.declarations()))
            .await?;

        let call = match reply {
            ModelReply::Answer(answer) => {
                info!("Turn: direct answer");
                session.push(Message::new(Role::Assistant, answer.clone()));
                return Ok(TurnReport {
                    answer,
                    tool: None,
                    display: TurnDisplay::None,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
            ModelReply::ToolCall(call) => call,
        };

        info!(tool = %call.name, arguments = %call.arguments, "Turn: tool dispatch");
        let outcome = self.registry.dispatch(&call).await;
        debug!(tool = %call.name, failure = outcome.is_failure(), "Turn: tool finished");

        session.push(Message::tool_result(call.name.clone(), outcome.text()));

        debug!("Turn: awaiting final answer");
        let answer = match self.model.decide(session.messages(), None).await? {
            ModelReply::Answer(answer) => answer,
            // Tools were not offered; a call here is ignored in favour of the raw result.
            ModelReply::ToolCall(extra) => {
                info!(tool = %extra.name, "Model asked for a second tool, ignoring");
                outcome.text().to_string()
            }
        };
        session.push(Message::new(Role::Assistant, answer.clone()));

        let display = self.display_for(&call, &outcome).await;

        Ok(TurnReport {
            answer,
            tool: Some(ToolRun { call, outcome }),
            display,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn display_for(&self, call: &ToolCall, outcome: &ToolOutcome) -> TurnDisplay {
        match call.name.as_str() {
            GET_STOCK_HISTORY => {
                if outcome.is_failure() {
                    return TurnDisplay::Warning {
                        text: outcome.text().to_string(),
                    };
                }
                let ticker = call.str_arg("ticker").unwrap_or_default();
                match self.market.render_chart(ticker).await {
                    ChartOutcome::Chart(chart) => TurnDisplay::Chart { chart },
                    ChartOutcome::Warning(text) => TurnDisplay::Warning { text },
                    ChartOutcome::Error(text) => TurnDisplay::Error { text },
                }
            }
            GET_FINANCIAL_NEWS if outcome.is_failure() || outcome.is_notice() => {
                TurnDisplay::Warning {
                    text: outcome.text().to_string(),
                }
            }
            GET_EXCHANGE_RATE if outcome.is_failure() => TurnDisplay::Error {
                text: outcome.text().to_string(),
            },
            _ => TurnDisplay::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bar, FakeMarket, FakeNews, FakeRates, ScriptedModel};
    use crate::tools::GET_STOCK_PRICE;
    use serde_json::json;

    struct Harness {
        controller: TurnController,
        model: Arc<ScriptedModel>,
        market: Arc<FakeMarket>,
    }

    /// Forwards to a shared ScriptedModel so the test can inspect requests.
    struct SharedModel(Arc<ScriptedModel>);

    #[async_trait::async_trait]
    impl ChatModel for SharedModel {
        async fn decide(
            &self,
            transcript: &[Message],
            tools: Option<&[crate::models::ToolDeclaration]>,
        ) -> Result<ModelReply> {
            self.0.decide(transcript, tools).await
        }
    }

    fn harness(model: ScriptedModel, news: FakeNews) -> Harness {
        let market = Arc::new(
            FakeMarket::new()
                .with_symbol("AAPL", "Apple Inc.")
                .with_alias("Apple", "AAPL")
                .with_symbol("TSLA", "Tesla, Inc.")
                .with_alias("Tesla", "TSLA")
                .with_history(
                    "AAPL",
                    vec![
                        bar(2024, 6, 13, 214.24, 216.75, 211.6, 97_862_700),
                        bar(2024, 6, 14, 212.49, 215.17, 211.3, 70_122_700),
                    ],
                )
                .with_history("TSLA", vec![]),
        );
        let resolver = Arc::new(TickerResolver::new(market.clone()));
        let market_client = Arc::new(MarketDataClient::new(market.clone(), resolver.clone()));
        let registry = create_default_registry(
            market_client.clone(),
            Arc::new(NewsClient::new(Arc::new(news), resolver)),
            Arc::new(FxClient::new(Arc::new(FakeRates::new(
                &[("USD", 1.0), ("EUR", 0.9215)],
                1_718_611_200,
            )))),
        );

        let model = Arc::new(model);
        Harness {
            controller: TurnController::new(
                Box::new(SharedModel(model.clone())),
                registry,
                market_client,
            ),
            model,
            market,
        }
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let h = harness(
            ScriptedModel::new().answer("I can only answer financial questions."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h.controller.run_turn(&mut session, "Tell me a joke").await.unwrap();

        assert_eq!(report.answer, "I can only answer financial questions.");
        assert!(report.tool.is_none());
        assert_eq!(report.display, TurnDisplay::None);
        assert_eq!(session.message_count(), 3);
        assert_eq!(h.model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_price_turn_end_to_end() {
        let h = harness(
            ScriptedModel::new()
                .call(GET_STOCK_PRICE, json!({"ticker": "AAPL"}))
                .answer("Apple (AAPL) closed at 212.49 USD on 14.06.2024."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h
            .controller
            .run_turn(&mut session, "What is the current price of Apple stock?")
            .await
            .unwrap();

        let run = report.tool.unwrap();
        assert_eq!(run.call.name, GET_STOCK_PRICE);
        assert!(run.outcome.text().contains("Closing price: **212.49 USD**"));
        assert_eq!(report.answer, "Apple (AAPL) closed at 212.49 USD on 14.06.2024.");
        assert_eq!(report.display, TurnDisplay::None);

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Tool, Role::Assistant]
        );
        assert_eq!(session.messages()[2].name.as_deref(), Some(GET_STOCK_PRICE));

        let requests = h.model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].offered_tools.len(), 4);
        assert!(requests[1].offered_tools.is_empty());
        assert_eq!(requests[1].transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_history_turn_renders_chart() {
        let h = harness(
            ScriptedModel::new()
                .call(GET_STOCK_HISTORY, json!({"ticker": "Apple"}))
                .answer("Here is the history."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h
            .controller
            .run_turn(&mut session, "Show me the price history for Apple.")
            .await
            .unwrap();

        match report.display {
            TurnDisplay::Chart { chart } => {
                assert_eq!(chart.ticker, "AAPL");
                assert_eq!(chart.points.len(), 2);
            }
            other => panic!("expected chart, got {:?}", other),
        }
        // One fetch for the tool, one for the chart.
        assert_eq!(h.market.history_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_history_shows_warning_without_chart() {
        let h = harness(
            ScriptedModel::new()
                .call(GET_STOCK_HISTORY, json!({"ticker": "Tesla"}))
                .answer("Sorry, no data for Tesla."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h
            .controller
            .run_turn(&mut session, "Show me the price history for Tesla.")
            .await
            .unwrap();

        assert_eq!(
            report.display,
            TurnDisplay::Warning {
                text: "❌ No stock data available for this company.".to_string()
            }
        );
        assert_eq!(h.market.history_calls(), 1);
        assert_eq!(report.answer, "Sorry, no data for Tesla.");
    }

    #[tokio::test]
    async fn test_exchange_rate_turn() {
        let h = harness(
            ScriptedModel::new()
                .call(GET_EXCHANGE_RATE, json!({"from_currency": "EUR", "to_currency": "USD"}))
                .answer("1 EUR = 1.0852 USD."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h
            .controller
            .run_turn(&mut session, "exchange rate from EUR to USD")
            .await
            .unwrap();

        let outcome = report.tool.unwrap().outcome;
        assert!(outcome.text().starts_with("1 EUR = **1.0852 USD**\n"));
        assert!(outcome.text().ends_with(" UTC_"));
        assert_eq!(report.display, TurnDisplay::None);
    }

    #[tokio::test]
    async fn test_missing_currency_shows_error() {
        let h = harness(
            ScriptedModel::new()
                .call(GET_EXCHANGE_RATE, json!({"from_currency": "EUR", "to_currency": "XYZ"}))
                .answer("That currency pair is not available."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h.controller.run_turn(&mut session, "EUR to XYZ?").await.unwrap();
        assert_eq!(
            report.display,
            TurnDisplay::Error {
                text: "❌ The currency pair could not be found.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_no_news_shows_warning() {
        let h = harness(
            ScriptedModel::new()
                .call(GET_FINANCIAL_NEWS, json!({"ticker": "AAPL"}))
                .answer("There is no recent news about Apple."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h.controller.run_turn(&mut session, "What's new with Apple?").await.unwrap();

        let outcome = report.tool.unwrap().outcome;
        assert!(outcome.is_notice());
        assert_eq!(outcome.text(), "ℹ️ No recent news found for **Apple Inc.**.");
        assert_eq!(
            report.display,
            TurnDisplay::Warning {
                text: outcome.text().to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_still_reaches_the_model() {
        let h = harness(
            ScriptedModel::new()
                .call("get_weather", json!({"city": "Berlin"}))
                .answer("I can only help with finance."),
            FakeNews::new(),
        );
        let mut session = Session::new();

        let report = h.controller.run_turn(&mut session, "Weather in Berlin?").await.unwrap();

        assert_eq!(session.messages()[2].content, "Unknown function call.");
        assert_eq!(session.messages()[2].name.as_deref(), Some("get_weather"));
        assert_eq!(report.answer, "I can only help with finance.");
        assert_eq!(report.display, TurnDisplay::None);
    }

    #[tokio::test]
    async fn test_model_error_keeps_user_message() {
        let h = harness(ScriptedModel::new().fail("service unavailable"), FakeNews::new());
        let mut session = Session::new();

        let result = h.controller.run_turn(&mut session, "Price of Apple?").await;

        assert!(result.is_err());
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.messages()[1].role, Role::User);
    }
}
