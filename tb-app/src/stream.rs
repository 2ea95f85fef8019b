//! Reassembles a streamed completion into text plus a single tool call.
//!
//! Only the first call index is kept; fragments of any later parallel call are counted and
//! dropped so their arguments never mix into the first call's JSON.

use tb_llm::{StreamChunk, ToolCall, Usage};

#[derive(Debug, Default)]
pub struct StreamAssembler {
    text: String,
    call_index: Option<u32>,
    call_id: Option<String>,
    tool_name: Option<String>,
    arguments: String,
    fragments: usize,
    dropped_fragments: usize,
    usage: Option<Usage>,
}

/// What the stream amounted to once it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledResponse {
    pub text: String,
    pub call_id: Option<String>,
    pub tool_name: Option<String>,
    /// Concatenated argument fragments, trimmed.
    pub arguments: String,
    pub fragments: usize,
    /// Fragments that belonged to a second, parallel tool call.
    pub dropped_fragments: usize,
    pub usage: Option<Usage>,
}

impl StreamAssembler {
    pub fn push(&mut self, chunk: StreamChunk) {
        match chunk {
            StreamChunk::Delta { content } => self.text.push_str(&content),
            StreamChunk::ToolCallFragment {
                index,
                id,
                name,
                arguments,
            } => {
                let first = *self.call_index.get_or_insert(index);
                if index != first {
                    if self.dropped_fragments == 0 {
                        tracing::warn!(
                            kept_index = first,
                            dropped_index = index,
                            "parallel streamed tool call ignored"
                        );
                    }
                    self.dropped_fragments += 1;
                    return;
                }
                self.fragments += 1;
                if self.call_id.is_none() {
                    self.call_id = id;
                }
                if self.tool_name.is_none() {
                    self.tool_name = name;
                }
                self.arguments.push_str(&arguments);
            }
            StreamChunk::Done { usage } => {
                if usage.is_some() {
                    self.usage = usage;
                }
            }
        }
    }

    pub fn finish(self) -> AssembledResponse {
        AssembledResponse {
            text: self.text,
            call_id: self.call_id,
            tool_name: self.tool_name,
            arguments: self.arguments.trim().to_string(),
            fragments: self.fragments,
            dropped_fragments: self.dropped_fragments,
            usage: self.usage,
        }
    }
}

impl AssembledResponse {
    /// A stream only counts as a tool call once argument text arrived.
    pub fn has_tool_call(&self) -> bool {
        !self.arguments.is_empty()
    }

    /// The reassembled call, or `None` when no argument text was streamed. A missing id is
    /// filled with `fallback_id`; a missing name stays empty and will not resolve to a tool.
    pub fn tool_call(&self, fallback_id: impl FnOnce() -> String) -> Option<ToolCall> {
        if !self.has_tool_call() {
            return None;
        }
        Some(ToolCall {
            id: self.call_id.clone().unwrap_or_else(fallback_id),
            name: self.tool_name.clone().unwrap_or_default(),
            arguments: self.arguments.clone(),
        })
    }
}
