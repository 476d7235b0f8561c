//! Azure OpenAI chat-completions client
//!
//! Uses the `functions` / `function_call` request shape. One long-lived
//! reqwest::Client is reused for connection pooling.

use super::ChatModel;
use crate::config::ModelSettings;
use crate::error::ChatError;
use crate::models::{Message, ModelReply, Role, ToolCall, ToolDeclaration};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub struct AzureOpenAiClient {
    client: Client,
    settings: ModelSettings,
}

impl AzureOpenAiClient {
    pub fn new(client: Client, settings: ModelSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.deployment
        )
    }
}

#[async_trait]
impl ChatModel for AzureOpenAiClient {
    async fn decide(
        &self,
        transcript: &[Message],
        tools: Option<&[ToolDeclaration]>,
    ) -> crate::Result<ModelReply> {
        let request = build_request(transcript, tools);

        info!(
            messages = request.messages.len(),
            functions = request.functions.as_ref().map(Vec::len).unwrap_or(0),
            "Calling Azure OpenAI"
        );

        let response = self
            .client
            .post(self.url())
            .query(&[("api-version", self.settings.api_version.as_str())])
            .header("api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Azure OpenAI request failed: {}", e);
                ChatError::ModelError(format!("Azure OpenAI error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Azure OpenAI error response ({}): {}", status, error_text);
            return Err(ChatError::ModelError(format!(
                "Azure OpenAI error ({}): {}",
                status, error_text
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Azure OpenAI response: {}", e);
            ChatError::ModelError(format!("Azure OpenAI parse error: {}", e))
        })?;

        into_reply(completion)
    }
}

fn build_request(transcript: &[Message], tools: Option<&[ToolDeclaration]>) -> CompletionRequest {
    let messages = transcript
        .iter()
        .map(|m| WireMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "function",
            },
            content: m.content.clone(),
            name: m.name.clone(),
        })
        .collect();

    let functions: Option<Vec<FunctionSpec>> = tools.map(|declarations| {
        declarations
            .iter()
            .map(|d| FunctionSpec {
                name: d.name,
                description: d.description,
                parameters: d.parameters_schema(),
            })
            .collect()
    });

    CompletionRequest {
        function_call: functions.as_ref().map(|_| "auto"),
        messages,
        functions,
    }
}

fn into_reply(completion: CompletionResponse) -> crate::Result<ModelReply> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::ModelError("No choices in Azure OpenAI response".to_string()))?
        .message;

    if let Some(call) = message.function_call {
        let arguments = match serde_json::from_str::<serde_json::Value>(&call.arguments) {
            Ok(value) if value.is_object() => value,
            _ => {
                warn!(
                    function = %call.name,
                    raw = %call.arguments,
                    "Function arguments are not a JSON object, using empty arguments"
                );
                serde_json::json!({})
            }
        };
        return Ok(ModelReply::ToolCall(ToolCall {
            name: call.name,
            arguments,
        }));
    }

    Ok(ModelReply::Answer(message.content.unwrap_or_default()))
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<FunctionSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    name: &'static str,
    description: &'static str,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}
