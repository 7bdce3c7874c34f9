use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{io, sync::Arc};
use tracing_subscriber::EnvFilter;
use weatherbot_core::{
    AgentExecutor, Config, ProviderId, Session, ToolRegistry, WeatherProvider, WeatherTool,
    load_settings,
    provider::{chat_model_from_settings, weather_provider_from_settings},
};

use crate::prompt::{ConsolePrompter, read_api_key};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherbot", version, about = "Ask an AI assistant about the current weather")]
pub struct Cli {
    /// Log agent steps and HTTP calls to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chat with the weather assistant (default).
    Chat,

    /// Look up the current weather directly, without the assistant.
    Lookup {
        /// One or more city names, e.g. "London" "New York".
        #[arg(required = true)]
        cities: Vec<String>,
    },

    /// Store an API key for a provider in the config file.
    Configure {
        /// Provider short name: "openweather" or "groq".
        provider: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command.unwrap_or(Command::Chat) {
            Command::Chat => chat().await,
            Command::Lookup { cities } => lookup(&cities).await,
            Command::Configure { provider } => configure(&provider),
        }
    }
}

/// `RUST_LOG` wins; otherwise only warnings, or debug output for our crates.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "warn,weatherbot_core=debug,weatherbot_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

async fn chat() -> Result<()> {
    let settings = load_settings()?;

    let weather = weather_provider_from_settings(&settings.weather)?;
    if settings.weather.api_key.is_none() {
        tracing::warn!(
            "No OpenWeatherMap API key configured; weather lookups will report the missing key"
        );
    }

    let model = chat_model_from_settings(&settings.model)?;
    let tools = ToolRegistry::new().with_tool(WeatherTool::new(Arc::from(weather)));
    let mut session = Session::new(AgentExecutor::new(model, tools));

    tracing::info!(model = %settings.model.model, "starting chat session");
    session.run(&mut ConsolePrompter, &mut io::stdout()).await
}

async fn lookup(cities: &[String]) -> Result<()> {
    let settings = load_settings()?;
    let provider = weather_provider_from_settings(&settings.weather)?;

    for (i, city) in cities.iter().enumerate() {
        if i > 0 {
            println!("{}", "-".repeat(30));
        }
        println!("{}", provider.summary(city).await);
    }

    Ok(())
}

fn configure(provider: &str) -> Result<()> {
    let id = ProviderId::try_from(provider)?;

    let Some(api_key) = read_api_key(id.as_str())? else {
        println!("Cancelled; configuration unchanged.");
        return Ok(());
    };

    let mut config = Config::load()?;
    config.upsert_provider_api_key(id, api_key);
    config.save()?;

    let path = Config::config_file_path().context("Saved, but could not resolve config path")?;
    println!("Saved API key for {id} to {}", path.display());
    println!("Note: {} in the environment takes precedence over this file.", id.env_var());

    Ok(())
}
