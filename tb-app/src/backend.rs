use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use tb_llm::{ChatMessage, ChatResponse, LlmClient, StreamChunk, ToolDefinition};

pub type ChunkStream = Pin<Box<dyn Stream<Item = tb_llm::Result<StreamChunk>> + Send>>;

/// The completion surface the conversation driver talks to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn model(&self) -> &str;

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> tb_llm::Result<ChatResponse>;

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> tb_llm::Result<ChunkStream>;
}

#[async_trait]
impl ChatBackend for LlmClient {
    fn model(&self) -> &str {
        LlmClient::model(self)
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> tb_llm::Result<ChatResponse> {
        LlmClient::chat(self, messages, tools).await
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> tb_llm::Result<ChunkStream> {
        LlmClient::chat_stream(self, messages, tools).await
    }
}
