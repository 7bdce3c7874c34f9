use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    agent::{AssistantReply, Message, ToolCall},
    config::ModelSettings,
    tool::ToolSpec,
};

use super::{ChatModel, openweather::truncate_body};

const CHAT_COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";

/// Chat model served by Groq's OpenAI-compatible API.
#[derive(Clone)]
pub struct GroqChatModel {
    api_key: String,
    base_url: String,
    model: String,
    http: Client,
}

impl std::fmt::Debug for GroqChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqChatModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GroqChatModel {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_owned();
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build Groq HTTP client")?;

        Ok(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[async_trait]
impl ChatModel for GroqChatModel {
    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantReply> {
        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let request = ChatRequest {
            model: &self.model,
            messages,
            tools: tools
                .iter()
                .map(|function| ToolDefinition { kind: "function", function })
                .collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
        };

        debug!(model = %self.model, messages = messages.len(), "sending chat completion");

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Groq (chat completions)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Groq response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Groq chat completion failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse Groq chat completion JSON")?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Groq response contained no choices"))?;

        debug!(finish_reason = ?choice.finish_reason, "chat completion received");

        Ok(AssistantReply {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }
}
