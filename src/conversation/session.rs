//! Chat session and transcript
//!
//! A session lives for the whole process. The transcript is append-only and
//! always starts with the fixed system instruction.

use crate::config::SUPPORT_PHONE_NUMBER;
use crate::models::{Message, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const TRANSCRIPT_FILE_NAME: &str = "financechat_history.txt";

fn system_instruction() -> String {
    format!(
        "You are a helpful financial assistant. \
         Only answer questions about stocks, markets, financial data, financial news, and exchange rates. \
         For all other topics, politely explain that you can only answer financial questions. \
         If users ask about current stock prices, price histories, or market data, use get_stock_price or get_stock_history. \
         For company news, use get_financial_news. \
         For currency and exchange rates, use get_exchange_rate. \
         For all other topics, DO NOT answer, but inform users that you are only responsible for finance and market inquiries. \
         If data is missing, kindly refer users to the support hotline {}.",
        SUPPORT_PHONE_NUMBER
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
            messages: vec![Message::new(Role::System, system_instruction())],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Offered once there is more than the system message and a first question
    pub fn can_download(&self) -> bool {
        self.messages.len() > 2
    }

    /// Plain-text transcript: user and assistant lines only
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        for msg in &self.messages {
            match msg.role {
                Role::User => out.push_str(&format!("User: {}\n", msg.content)),
                Role::Assistant => out.push_str(&format!("Assistant: {}\n", msg.content)),
                Role::System | Role::Tool => {}
            }
        }
        out
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
