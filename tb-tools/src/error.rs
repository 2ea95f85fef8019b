use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("tool registry: {0}")]
    Registry(String),

    #[error("tool configuration: {0}")]
    Config(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::ExecutionFailed(format!("request timed out: {e}"));
        }
        Self::ExecutionFailed(e.to_string())
    }
}
