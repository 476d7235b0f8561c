//! Language model seam
//!
//! The model sees the transcript and, on the first call of a turn, the tool
//! declarations. It either answers or asks for exactly one tool.

use crate::models::{Message, ModelReply, ToolDeclaration};
use crate::Result;
use async_trait::async_trait;

pub mod azure;
pub use azure::AzureOpenAiClient;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// `tools: None` forbids tool calls (second call of a tool turn)
    async fn decide(
        &self,
        transcript: &[Message],
        tools: Option<&[ToolDeclaration]>,
    ) -> Result<ModelReply>;
}
