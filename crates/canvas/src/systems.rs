use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolCall};

/// A group of tools the agent can call, e.g. the image generation tools
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with resolved arguments.
    ///
    /// Returns the tool's raw textual result. Its format is not trusted; the
    /// coordinator decodes it with [`crate::result_parser::parse`].
    async fn call(&self, tool_call: ToolCall) -> AgentResult<String>;

    fn has_tool(&self, name: &str) -> bool {
        self.tools().iter().any(|tool| tool.name == name)
    }
}
