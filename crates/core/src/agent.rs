//! Agent Factory
//!
//! Builds the two agent variants a realtime session can host: a bare
//! transcription agent and a conversation agent equipped with web search.

use crate::{
    api_key::ApiKey,
    options::Voice,
    tools::{Tool, ToolDefinition},
    web_search::{WebSearchClient, WebSearchSettings, WebSearchTool},
};
use std::{fmt, sync::Arc};

pub const TRANSCRIPTION_AGENT_NAME: &str = "RealtimeTranscriptionAgent";
pub const CONVERSATION_AGENT_NAME: &str = "RealtimeConversationAgent";

/// The agent hosted by a realtime session.
#[derive(Clone)]
pub struct RealtimeAgent {
    pub name: String,
    pub instructions: Option<String>,
    pub voice: Option<Voice>,
    pub tools: Vec<Arc<dyn Tool>>,
}

impl RealtimeAgent {
    /// Looks up a tool by the name the model called it with.
    pub fn tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| ToolDefinition::of(t.as_ref())).collect()
    }
}

impl fmt::Debug for RealtimeAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("RealtimeAgent")
            .field("name", &self.name)
            .field("instructions", &self.instructions)
            .field("voice", &self.voice)
            .field("tools", &tools)
            .finish()
    }
}

/// An agent with no tools, voice or instructions; it only hosts transcription.
pub fn create_transcription_agent() -> RealtimeAgent {
    RealtimeAgent {
        name: TRANSCRIPTION_AGENT_NAME.to_string(),
        instructions: None,
        voice: None,
        tools: Vec::new(),
    }
}

/// A conversational agent with the `web_search` tool.
///
/// `instructions` must already be resolved; no fallback is applied here.
pub fn create_conversation_agent(
    api_key: &ApiKey,
    instructions: String,
    voice: Option<Voice>,
    web_search: WebSearchSettings,
) -> RealtimeAgent {
    let search = WebSearchTool::new(WebSearchClient::new(api_key.clone(), web_search));
    RealtimeAgent {
        name: CONVERSATION_AGENT_NAME.to_string(),
        instructions: Some(instructions),
        voice,
        tools: vec![Arc::new(search)],
    }
}
