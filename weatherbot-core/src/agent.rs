use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    model::{ChatHistory, Role},
    provider::ChatModel,
    tool::ToolRegistry,
};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant specialized in providing current weather information.";
pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const ITERATION_LIMIT_REPLY: &str = "Agent stopped due to iteration limit or time limit.";

/// One message in the chat-completions wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant { content: Some(content.into()), tool_calls: Vec::new() }
    }
}

impl From<AssistantReply> for Message {
    fn from(reply: AssistantReply) -> Self {
        Message::Assistant { content: reply.content, tool_calls: reply.tool_calls }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall { name: name.into(), arguments: arguments.into() },
        }
    }
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

/// What the model said in one round: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), tool_calls: Vec::new() }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self { content: None, tool_calls: calls }
    }
}

/// Runs the model, executing requested tool calls, until it answers in text.
#[derive(Debug)]
pub struct AgentExecutor {
    model: Box<dyn ChatModel>,
    tools: ToolRegistry,
    system_prompt: String,
    max_iterations: usize,
}

impl AgentExecutor {
    pub fn new(model: Box<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub async fn invoke(&self, history: &ChatHistory, input: &str) -> Result<String> {
        let mut messages = self.initial_messages(history, input);
        let specs = self.tools.specs();

        for iteration in 0..self.max_iterations {
            let reply = self.model.complete(&messages, &specs).await?;
            debug!(iteration, tool_calls = reply.tool_calls.len(), "model replied");

            if reply.tool_calls.is_empty() {
                return reply
                    .content
                    .ok_or_else(|| anyhow!("Model returned neither text nor tool calls"));
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply.into());

            for call in calls {
                info!(
                    tool = %call.function.name,
                    arguments = %call.function.arguments,
                    "agent called tool"
                );
                let output = self.tools.call(&call.function.name, &call.function.arguments).await;
                messages.push(Message::Tool { tool_call_id: call.id, content: output });
            }
        }

        info!(max_iterations = self.max_iterations, "agent hit iteration limit");
        Ok(ITERATION_LIMIT_REPLY.to_string())
    }

    fn initial_messages(&self, history: &ChatHistory, input: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(history.turns().iter().map(|turn| match turn.role {
            Role::User => Message::user(&turn.text),
            Role::Assistant => Message::assistant(&turn.text),
        }));
        messages.push(Message::user(input));
        messages
    }
}
