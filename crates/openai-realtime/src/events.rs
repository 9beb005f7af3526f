//! Client and server event shapes of the Realtime API that the session uses.

use realtime_voice_core::{history::HistoryItem, session_config::SessionConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent<'a> {
    #[serde(rename = "session.update")]
    SessionUpdate { session: &'a SessionConfig },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ClientItem },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    #[serde(rename = "response.create")]
    ResponseCreate,
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientItem {
    Message {
        role: &'static str,
        content: Vec<InputContent>,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

#[derive(Debug, Serialize)]
pub struct InputContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ClientItem {
    pub fn user_text(text: &str) -> Self {
        ClientItem::Message {
            role: "user",
            content: vec![InputContent {
                kind: "input_text",
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Server events the session reacts to; everything else is `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error { error: ApiError },
    #[serde(rename = "conversation.item.added", alias = "conversation.item.created")]
    ItemAdded {
        item: HistoryItem,
        #[serde(default)]
        previous_item_id: Option<String>,
    },
    #[serde(rename = "conversation.item.done")]
    ItemDone { item: HistoryItem },
    #[serde(rename = "conversation.item.deleted")]
    ItemDeleted { item_id: String },
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted {
        item_id: String,
        #[serde(default)]
        content_index: usize,
        transcript: String,
    },
    #[serde(rename = "conversation.item.input_audio_transcription.failed")]
    InputTranscriptionFailed { item_id: String, error: ApiError },
    #[serde(
        rename = "response.output_audio_transcript.done",
        alias = "response.audio_transcript.done"
    )]
    OutputTranscriptDone {
        item_id: String,
        #[serde(default)]
        content_index: usize,
        transcript: String,
    },
    #[serde(rename = "response.output_audio.delta", alias = "response.audio.delta")]
    OutputAudioDelta { delta: String },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        call_id: String,
        #[serde(default)]
        name: Option<String>,
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_events_serialize_with_type_tag() {
        let create = ClientEvent::ConversationItemCreate {
            item: ClientItem::user_text("hi"),
        };
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({
                "type": "conversation.item.create",
                "item": { "type": "message", "role": "user",
                          "content": [{ "type": "input_text", "text": "hi" }] }
            })
        );
        assert_eq!(
            serde_json::to_value(&ClientEvent::ResponseCreate).unwrap(),
            json!({ "type": "response.create" })
        );
        assert_eq!(
            serde_json::to_value(&ClientEvent::ResponseCancel).unwrap(),
            json!({ "type": "response.cancel" })
        );
        assert_eq!(
            serde_json::to_value(&ClientEvent::InputAudioBufferAppend {
                audio: "AQIDBA==".into()
            })
            .unwrap(),
            json!({ "type": "input_audio_buffer.append", "audio": "AQIDBA==" })
        );

        let output = ClientEvent::ConversationItemCreate {
            item: ClientItem::FunctionCallOutput {
                call_id: "call_1".into(),
                output: "sunny".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap()["item"],
            json!({ "type": "function_call_output", "call_id": "call_1", "output": "sunny" })
        );
    }

    #[test]
    fn test_parse_item_added() {
        let ev: ServerEvent = serde_json::from_value(json!({
            "type": "conversation.item.added",
            "event_id": "evt_1",
            "previous_item_id": null,
            "item": { "id": "item_1", "type": "message", "role": "user", "status": "completed",
                      "content": [{ "type": "input_audio", "transcript": null }] }
        }))
        .unwrap();
        match ev {
            ServerEvent::ItemAdded { item, previous_item_id } => {
                assert_eq!(item.stable_id(), Some("item_1"));
                assert!(previous_item_id.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_legacy_aliases() {
        let ev: ServerEvent = serde_json::from_value(json!({
            "type": "response.audio_transcript.done",
            "item_id": "item_2", "content_index": 0, "transcript": "Hello"
        }))
        .unwrap();
        assert!(matches!(ev, ServerEvent::OutputTranscriptDone { .. }));

        let ev: ServerEvent =
            serde_json::from_value(json!({ "type": "response.audio.delta", "delta": "AAA=" })).unwrap();
        assert!(matches!(ev, ServerEvent::OutputAudioDelta { .. }));
    }

    #[test]
    fn test_unknown_events_are_other() {
        let ev: ServerEvent =
            serde_json::from_value(json!({ "type": "rate_limits.updated", "rate_limits": [] })).unwrap();
        assert!(matches!(ev, ServerEvent::Other));
    }

    #[test]
    fn test_parse_error_event() {
        let ev: ServerEvent = serde_json::from_value(json!({
            "type": "error",
            "error": { "type": "invalid_request_error", "message": "bad voice", "code": null }
        }))
        .unwrap();
        match ev {
            ServerEvent::Error { error } => assert_eq!(error.message, "bad voice"),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
