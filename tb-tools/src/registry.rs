use crate::error::{Result, ToolError};
use crate::traits::{Tool, to_llm_tool_def};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The tools the driver is willing to run on the model's behalf, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.spec().name;
        tb_llm::validate_tool_name(&name).map_err(|e| ToolError::Registry(e.to_string()))?;
        if self.tools.contains_key(&name) {
            return Err(ToolError::Registry(format!("duplicate tool name: {name}")));
        }
        tracing::debug!(tool_name = %name, "tool registered");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool descriptors in name order, ready to send with a completion request.
    pub fn definitions(&self) -> Vec<tb_llm::ToolDefinition> {
        self.tools
            .values()
            .map(|t| to_llm_tool_def(t.as_ref()))
            .collect()
    }
}
