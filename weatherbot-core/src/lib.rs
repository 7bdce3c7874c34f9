//! Core library for the `weatherbot` assistant.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap lookup and its error taxonomy
//! - The tool registry exposed to the language model
//! - The Groq chat-model client and the agent executor that drives it
//! - The console session that keeps chat history
//!
//! It is used by `weatherbot-cli`, but can also be reused by other binaries or services.

pub mod agent;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod session;
pub mod tool;

pub use agent::{AgentExecutor, AssistantReply, Message, ToolCall};
pub use config::{Config, ModelSettings, ProviderConfig, Settings, WeatherSettings, load_settings};
pub use error::ApiError;
pub use model::{ChatHistory, ChatTurn, Role, WeatherReport};
pub use provider::{ChatModel, ProviderId, WeatherProvider};
pub use session::{Prompter, Session};
pub use tool::{Tool, ToolRegistry, ToolSpec, WeatherTool};
