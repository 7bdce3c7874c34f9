//! Capabilities the agent is allowed to call.
//!
//! A tool is described by a [`ToolSpec`] (name, JSON-schema parameters and a
//! description written for the model) and registered into a [`ToolRegistry`].
//! The registry is the only thing the agent talks to: it hands out the specs
//! and turns every call, successful or not, into text.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

use crate::provider::WeatherProvider;

pub const WEATHER_TOOL_NAME: &str = "get_current_weather";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn call(&self, args: Value) -> Result<String>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.spec().name;
        self.tools.insert(name, Box::new(tool));
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Runs `name` with the model-supplied JSON argument string.
    ///
    /// Never fails: unknown tools, bad arguments and tool errors all come back
    /// as text the model can read and react to.
    pub async fn call(&self, name: &str, raw_args: &str) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!(
                "{name} is not a valid tool, try one of [{}].",
                self.names().join(", ")
            );
        };

        let args = match parse_args(raw_args) {
            Ok(args) => args,
            Err(err) => return format!("Invalid arguments for tool '{name}': {err}"),
        };

        debug!(tool = name, %args, "invoking tool");
        let output = match tool.call(args).await {
            Ok(output) => output,
            Err(err) => format!("Error: {err}"),
        };
        debug!(tool = name, %output, "tool finished");

        output
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

fn parse_args(raw: &str) -> Result<Value> {
    // Some models send an empty string for "no arguments".
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }

    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(anyhow!("expected a JSON object, got {value}"));
    }
    Ok(value)
}

/// Exposes a [`WeatherProvider`] lookup to the agent.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherTool {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
}

#[async_trait]
impl Tool for WeatherTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: WEATHER_TOOL_NAME.to_string(),
            description: "Fetches the current weather for a specified city using the \
                          OpenWeatherMap API. Input should be the name of the city \
                          (e.g., \"London\", \"New York\"). Provides temperature, feels \
                          like temperature, description, humidity, and wind speed in Celsius."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "Name of the city, e.g. London"
                    }
                },
                "required": ["city"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String> {
        let WeatherArgs { city } = serde_json::from_value(args)
            .map_err(|e| anyhow!("missing required argument 'city' ({e})"))?;

        if city.trim().is_empty() {
            return Err(anyhow!("argument 'city' must not be empty"));
        }

        Ok(self.provider.summary(&city).await)
    }
}
