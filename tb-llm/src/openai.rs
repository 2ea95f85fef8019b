use crate::error::{LlmError, Result};
use crate::types::{
    ChatMessage, ChatResponse, ModelInfo, Role, SamplingParams, StreamChunk, ToolCall,
    ToolDefinition, Usage,
};
use bytes::Bytes;
use futures_util::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;

/// Wire-level client for an OpenAI-compatible `/v1` surface.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string).filter(|k| !k.is_empty()),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.http.get(format!("{}{path}", self.base_url)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.http.post(format!("{}{path}", self.base_url)))
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(base_url = %self.base_url))]
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self.get("/models").send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                endpoint: "models",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OpenAiModelList = serde_json::from_str(&body)?;
        Ok(parsed.data)
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %model))]
    pub async fn chat(
        &self,
        model: &str,
        sampling: SamplingParams,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse> {
        let req = OpenAiChatRequest::new(model, sampling, messages, tools, None);

        let response = self.post("/chat/completions").json(&req).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                endpoint: "chat/completions",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OpenAiChatResponse = serde_json::from_str(&body)?;
        parsed.try_into()
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %model))]
    pub async fn chat_stream(
        &self,
        model: &str,
        sampling: SamplingParams,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        include_usage: bool,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>> {
        let req = OpenAiChatRequest::new(model, sampling, messages, tools, Some(include_usage));

        let response = self.post("/chat/completions").json(&req).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                endpoint: "chat/completions (stream)",
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(chunk_stream(response.bytes_stream())))
    }
}

/// Turns a raw SSE byte stream into [`StreamChunk`]s. Always ends with exactly one
/// `StreamChunk::Done`, whether or not the server sent `[DONE]`.
fn chunk_stream<S>(bytes_stream: S) -> impl Stream<Item = Result<StreamChunk>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let sse = Box::pin(decode_sse(bytes_stream));
    futures_util::stream::unfold(
        (sse, OpenAiStreamState::default()),
        |(mut sse, mut state)| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Some((Ok(chunk), (sse, state)));
                }
                if state.finished {
                    return None;
                }
                match sse.as_mut().next().await {
                    Some(Ok(SseEvent::Data(data))) => {
                        if data.trim() == "[DONE]" {
                            state.finish();
                            continue;
                        }
                        match serde_json::from_str::<OpenAiStreamResponseChunk>(&data) {
                            Ok(chunk) => state.absorb(chunk),
                            Err(e) => {
                                return Some((
                                    Err(LlmError::StreamParse(format!(
                                        "chunk json error={e} data={data}"
                                    ))),
                                    (sse, state),
                                ));
                            }
                        }
                    }
                    Some(Ok(SseEvent::Other)) => continue,
                    Some(Err(e)) => return Some((Err(e), (sse, state))),
                    None => state.finish(),
                }
            }
        },
    )
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<OpenAiStreamOptions>,
}

#[derive(Debug, Serialize)]
struct OpenAiStreamOptions {
    include_usage: bool,
}

impl OpenAiChatRequest {
    /// `stream` is `None` for a buffered request, otherwise `Some(include_usage)`.
    fn new(
        model: &str,
        sampling: SamplingParams,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: Option<bool>,
    ) -> Self {
        let mut out = Self {
            model: model.to_string(),
            messages: messages.iter().map(to_openai_message).collect(),
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_tokens,
            tools: tools.iter().map(to_openai_tool).collect(),
            tool_choice: None,
            stream: None,
            stream_options: None,
        };

        if !out.tools.is_empty() {
            out.tool_choice = Some("auto".to_string());
        }

        if let Some(include_usage) = stream {
            out.stream = Some(true);
            if include_usage {
                out.stream_options = Some(OpenAiStreamOptions {
                    include_usage: true,
                });
            }
        }

        out
    }
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiToolFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

fn to_openai_tool(t: &ToolDefinition) -> OpenAiTool {
    OpenAiTool {
        r#type: "function".to_string(),
        function: OpenAiToolFunction {
            name: t.name.clone(),
            description: t.description.clone(),
            parameters: t.parameters.clone(),
        },
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiToolCall {
    id: String,
    r#type: String,
    function: OpenAiToolFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAiToolFunctionCall {
    name: String,
    arguments: String,
}

fn to_openai_message(m: &ChatMessage) -> OpenAiMessage {
    let role = match m.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    // Tool messages always carry content, even when the tool returned nothing.
    let content = if m.role == Role::Tool {
        Some(m.content.clone())
    } else {
        Some(m.content.clone()).filter(|s| !s.is_empty())
    };
    OpenAiMessage {
        role: role.to_string(),
        content,
        tool_calls: m
            .tool_calls
            .iter()
            .map(|tc| OpenAiToolCall {
                id: tc.id.clone(),
                r#type: "function".to_string(),
                function: OpenAiToolFunctionCall {
                    name: tc.name.clone(),
                    arguments: tc.arguments.clone(),
                },
            })
            .collect(),
        tool_call_id: m.tool_call_id.clone(),
        name: m.name.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiChoiceToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceToolCall {
    id: String,
    #[serde(default)]
    function: OpenAiChoiceToolCallFunction,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAiChoiceToolCallFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl From<OpenAiUsage> for Usage {
    fn from(u: OpenAiUsage) -> Self {
        let prompt_tokens = u.prompt_tokens.unwrap_or(0);
        let completion_tokens = u.completion_tokens.unwrap_or(0);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: u
                .total_tokens
                .unwrap_or_else(|| prompt_tokens.saturating_add(completion_tokens)),
        }
    }
}

impl TryFrom<OpenAiChatResponse> for ChatResponse {
    type Error = LlmError;

    fn try_from(v: OpenAiChatResponse) -> Result<Self> {
        let choice = v
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseFormat("response missing choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ChatResponse {
            message: ChatMessage::assistant(choice.message.content.unwrap_or_default(), tool_calls),
            usage: v.usage.map(Usage::from).unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[derive(Debug)]
enum SseEvent {
    Data(String),
    Other,
}

struct SseState<S> {
    stream: S,
    buffer: Vec<u8>,
    eof: bool,
}

fn decode_sse<S>(bytes_stream: S) -> impl Stream<Item = Result<SseEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let state = SseState {
        stream: bytes_stream,
        buffer: Vec::new(),
        eof: false,
    };
    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(idx) = state.buffer.windows(2).position(|w| w == b"\n\n") {
                let raw: Vec<u8> = state.buffer.drain(..idx + 2).take(idx).collect();
                // Events end on a newline, so a complete event never splits a character.
                let event = match std::str::from_utf8(&raw) {
                    Ok(text) => parse_sse_event(text),
                    Err(e) => Err(LlmError::StreamParse(format!("event is not utf-8: {e}"))),
                };
                return Some((event, state));
            }
            if state.eof {
                return None;
            }

            match state.stream.next().await {
                Some(Ok(chunk)) => push_normalized(&mut state.buffer, &chunk),
                Some(Err(e)) => {
                    return Some((Err(LlmError::Transport(e.to_string())), state));
                }
                None => {
                    state.eof = true;
                    if state.buffer.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    // Flush a trailing event that was not terminated by a blank line.
                    state.buffer.extend_from_slice(b"\n\n");
                }
            }
        }
    })
}

/// Appends `chunk`, folding `\r\n` into `\n` even when the pair straddles two reads.
fn push_normalized(buffer: &mut Vec<u8>, chunk: &[u8]) {
    for &b in chunk {
        if b == b'\n' && buffer.last() == Some(&b'\r') {
            buffer.pop();
        }
        buffer.push(b);
    }
}

fn parse_sse_event(raw: &str) -> Result<SseEvent> {
    let data_lines: Vec<&str> = raw
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data_lines.is_empty() {
        return Ok(SseEvent::Other);
    }
    Ok(SseEvent::Data(data_lines.join("\n")))
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamResponseChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiStreamDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDeltaToolCall {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiStreamDeltaToolFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDeltaToolFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct OpenAiStreamState {
    pending: VecDeque<StreamChunk>,
    usage: Option<Usage>,
    finished: bool,
}

impl OpenAiStreamState {
    fn absorb(&mut self, chunk: OpenAiStreamResponseChunk) {
        if let Some(u) = chunk.usage {
            self.usage = Some(u.into());
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return;
        };
        let delta = choice.delta;
        if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
            self.pending.push_back(StreamChunk::Delta { content });
        }

        for tc in delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = match tc.function {
                Some(f) => (
                    f.name.filter(|n| !n.is_empty()),
                    f.arguments.unwrap_or_default(),
                ),
                None => (None, String::new()),
            };
            let id = tc.id.filter(|id| !id.is_empty());
            if id.is_none() && name.is_none() && arguments.is_empty() {
                continue;
            }
            self.pending.push_back(StreamChunk::ToolCallFragment {
                index: tc.index.unwrap_or(0),
                id,
                name,
                arguments,
            });
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.pending.push_back(StreamChunk::Done { usage: self.usage });
    }
}
