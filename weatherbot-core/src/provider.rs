use crate::{
    ApiError, WeatherReport,
    agent::{AssistantReply, Message},
    config::{ModelSettings, WeatherSettings},
    provider::{groq::GroqChatModel, openweather::OpenWeatherProvider},
    tool::ToolSpec,
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod groq;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    Groq,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::Groq => "groq",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::Groq => "GROQ_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::Groq]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "groq" => Ok(ProviderId::Groq),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, groq."
            )),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> Result<WeatherReport, ApiError>;

    /// The lookup folded into text: the report on success, the error message otherwise.
    async fn summary(&self, city: &str) -> String {
        match self.current_weather(city).await {
            Ok(report) => report.to_string(),
            Err(err) => err.to_string(),
        }
    }
}

/// The language-model side of the agent.
#[async_trait]
pub trait ChatModel: Send + Sync + Debug {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> anyhow::Result<AssistantReply>;
}

/// Construct the weather provider. A missing API key is allowed here.
pub fn weather_provider_from_settings(
    settings: &WeatherSettings,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    Ok(Box::new(OpenWeatherProvider::new(settings)?))
}

/// Construct the chat model, failing when no model API key is configured.
pub fn chat_model_from_settings(settings: &ModelSettings) -> anyhow::Result<Box<dyn ChatModel>> {
    settings.require_api_key()?;
    Ok(Box::new(GroqChatModel::new(settings)?))
}
