//! Function tools the model can call during a session, and their wire definitions.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A function tool the realtime runtime may call on behalf of the model.
///
/// Construction must be side-effect free; any I/O happens in `invoke`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    /// Runs the tool with the model-supplied arguments and returns its text output.
    async fn invoke(&self, arguments: Value) -> anyhow::Result<String>;
}

/// Declaration of a tool as sent in the session configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            kind: "function",
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        }
    }
}
