use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current conditions for one city, as returned by a single provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub country: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Numbers use `f64`'s `Display`: a whole value such as `15.0` prints as `15`.
impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current weather in {}, {}:", self.city, self.country)?;
        writeln!(
            f,
            "Temperature: {}°C (feels like {}°C)",
            self.temperature_c, self.feels_like_c
        )?;
        writeln!(f, "Description: {}", capitalize(&self.description))?;
        writeln!(f, "Humidity: {}%", self.humidity_pct)?;
        write!(f, "Wind Speed: {} m/s", self.wind_speed_mps)
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// Append-only conversation history, kept in memory for one session.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed exchange: the user's input followed by the reply.
    pub fn push_exchange(&mut self, input: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(ChatTurn::user(input));
        self.turns.push(ChatTurn::assistant(reply));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
