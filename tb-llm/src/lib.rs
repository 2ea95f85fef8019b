//! Client for OpenAI-compatible chat-completion servers (SGLang, vLLM, llama.cpp, ...).
//!
//! Pure HTTP client: model discovery, buffered completions and SSE streaming with tool calls.

mod client;
mod error;
mod openai;
mod types;

pub use client::{DEFAULT_BASE_URL, LlmClient, LlmClientConfig, validate_tool_name};
pub use error::{LlmError, Result};
pub use types::{
    ChatMessage, ChatResponse, ModelInfo, Role, SamplingParams, StreamChunk, ToolCall,
    ToolDefinition, Usage,
};
