use thiserror::Error;

/// Every way a weather lookup can fail.
///
/// The `Display` text is what the agent sees, so each message is written for
/// a person rather than a log file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error(
        "Error: OpenWeatherMap API key not found. Please set OPENWEATHER_API_KEY \
         in your environment or run `weatherbot configure openweather`."
    )]
    MissingCredential,

    #[error("City '{city}' not found. Please check the spelling.")]
    CityNotFound { city: String },

    #[error("HTTP error occurred: {message} - Status Code: {status}")]
    Http { status: u16, message: String },

    #[error("Connection error: Please check your internet connection. {0}")]
    Connection(String),

    #[error("Timeout error: The request took too long to respond. {0}")]
    Timeout(String),

    #[error("Malformed response from OpenWeatherMap: {0}")]
    MalformedResponse(String),

    #[error("Could not retrieve weather for {city}. Reason: {reason}")]
    Unavailable { city: String, reason: String },

    #[error("An unexpected error occurred during the API request: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Classifies a transport-level failure from `reqwest`.
    ///
    /// The URL is stripped first: its query string carries the API key.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::Unknown(err.to_string())
        }
    }
}
