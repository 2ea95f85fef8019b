use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    #[error("stream parse error: {0}")]
    StreamParse(String),

    #[error("server returned no models")]
    NoModels,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(e: serde_json::Error) -> Self {
        Self::ResponseFormat(e.to_string())
    }
}
