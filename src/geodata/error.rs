use thiserror::Error;

/// Errors raised by the geodata HTTP clients
#[derive(Error, Debug)]
pub enum GeodataError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Rate limit error: {0}")]
    RateLimitError(String),
}

impl From<reqwest::Error> for GeodataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GeodataError::ParseError(err.to_string())
        } else {
            GeodataError::NetworkError(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, GeodataError>;
