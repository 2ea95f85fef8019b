use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// What a tool hands back to the conversation.
///
/// `Failure` covers upstream problems the model should hear about (a weather service answering
/// 503, say) without ending the run. Errors that should end the run are `ToolError`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Success(String),
    Failure(String),
}

impl ToolOutput {
    pub fn text(&self) -> &str {
        match self {
            Self::Success(s) | Self::Failure(s) => s,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Success(s) | Self::Failure(s) => s,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput>;
}

pub fn to_llm_tool_def(tool: &dyn Tool) -> tb_llm::ToolDefinition {
    let spec = tool.spec();
    tb_llm::ToolDefinition {
        name: spec.name,
        description: spec.description,
        parameters: spec.parameters_schema,
    }
}

/// Decodes tool arguments into a typed struct, reporting which tool rejected them.
pub(crate) fn decode_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: serde_json::Value,
) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("{tool}: {e}")))
}
