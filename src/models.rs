//! Core data models for the finance chatbot

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Transcript =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Output of a tool, tagged with the tool name
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content: content.into(),
            name: None,
        }
    }

    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

//
// ================= Tool Declarations =================
//

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDeclaration {
    /// JSON-schema shaped `parameters` object as expected by function calling
    pub fn parameters_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    serde_json::json!({
                        "type": p.kind,
                        "description": p.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

//
// ================= Model I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// What the model decided to do with the transcript
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Answer(String),
    ToolCall(ToolCall),
}

//
// ================= Tool Outcome =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Upstream had no data for the request
    NoData,
    /// Upstream answered with a non-success status
    UpstreamStatus(u16),
    /// Transport, parse or other unexpected error
    Unexpected,
    /// One or both currency codes are not in the rate table
    PairNotFound,
    UnknownTool,
    MissingArgument,
}

/// Result of a tool invocation. The text is always what the model sees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome {
    Success { text: String },
    /// Informational, not an error (e.g. no recent news)
    Notice { text: String },
    Failure { reason: FailureReason, text: String },
}

pub const FAILURE_MARKER: &str = "❌";
pub const NOTICE_MARKER: &str = "ℹ️";
pub const UNKNOWN_FUNCTION_CALL: &str = "Unknown function call.";

impl ToolOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        ToolOutcome::Success { text: text.into() }
    }

    pub fn notice(message: impl fmt::Display) -> Self {
        ToolOutcome::Notice {
            text: format!("{} {}", NOTICE_MARKER, message),
        }
    }

    /// Failure whose text starts with the failure marker
    pub fn failure(reason: FailureReason, message: impl fmt::Display) -> Self {
        ToolOutcome::Failure {
            reason,
            text: format!("{} {}", FAILURE_MARKER, message),
        }
    }

    pub fn unknown_tool() -> Self {
        ToolOutcome::Failure {
            reason: FailureReason::UnknownTool,
            text: UNKNOWN_FUNCTION_CALL.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success { text }
            | ToolOutcome::Notice { text }
            | ToolOutcome::Failure { text, .. } => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::Failure { .. })
    }

    pub fn is_notice(&self) -> bool {
        matches!(self, ToolOutcome::Notice { .. })
    }
}

//
// ================= Market Data =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars, oldest first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub short_name: Option<String>,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn display_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.symbol)
    }
}

/// Latest row of a price series
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub name: String,
    pub ticker: String,
    pub as_of: NaiveDate,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
}

impl PriceSnapshot {
    pub fn from_series(series: &PriceSeries) -> Option<Self> {
        let last = series.bars.last()?;
        Some(Self {
            name: series.display_name().to_string(),
            ticker: series.symbol.clone(),
            as_of: last.date,
            close: last.close,
            high: last.high,
            low: last.low,
            volume: last.volume,
        })
    }
}

/// Symbol metadata returned by a direct lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub symbol: String,
    pub short_name: Option<String>,
}

//
// ================= News / FX =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub published_at: String,
    pub source: String,
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    pub base: Option<String>,
    pub rates: std::collections::HashMap<String, f64>,
    /// Snapshot time, epoch seconds
    pub timestamp: i64,
}

//
// ================= Chart / Display =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceChart {
    pub ticker: String,
    pub title: String,
    /// Oldest first
    pub points: Vec<ChartPoint>,
}

/// What the presentation layer shows next to the assistant's answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TurnDisplay {
    None,
    Chart { chart: PriceChart },
    Warning { text: String },
    Error { text: String },
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::Tool => "Tool",
        };
        write!(f, "{}", s)
    }
}
