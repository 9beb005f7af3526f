//! History Normalizer
//!
//! Sessions redeliver the whole conversation on every update. The normalizer
//! turns each snapshot into display messages, emitting every item at most once
//! and only after it carries a transcript.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One conversation item as delivered by the session runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(default, alias = "itemId", skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    /// Set on `function_call` items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl HistoryItem {
    /// Stable identifier: the item-level id, falling back to the secondary id.
    pub fn stable_id(&self) -> Option<&str> {
        self.item_id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn parts(&self) -> &[ContentPart] {
        self.content.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A display row for one conversation item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
}

/// First non-blank transcript among the content parts, trimmed.
pub fn extract_transcript(parts: &[ContentPart]) -> Option<String> {
    parts
        .iter()
        .filter_map(|p| p.transcript.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

/// Message list plus the set of item ids already turned into messages.
///
/// Both are only ever changed together, so an id is in `seen` exactly when a
/// message with that id is in `messages`.
#[derive(Debug, Default)]
pub struct HistoryNormalizer {
    seen: HashSet<String>,
    messages: Vec<ChatMessage>,
}

impl HistoryNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one full snapshot and returns the messages it newly produced.
    pub fn ingest(&mut self, snapshot: &[HistoryItem]) -> Vec<ChatMessage> {
        let mut fresh = Vec::new();
        for item in snapshot {
            if item.kind != "message" {
                continue;
            }
            let Some(role) = item.role.as_deref().and_then(Role::parse) else {
                continue;
            };
            let Some(id) = item.stable_id() else {
                continue;
            };
            if self.seen.contains(id) {
                continue;
            }
            // not transcribed yet; a later snapshot will carry it
            let Some(text) = extract_transcript(item.parts()) else {
                continue;
            };

            let message = ChatMessage {
                id: id.to_string(),
                role,
                text,
            };
            self.seen.insert(message.id.clone());
            self.messages.push(message.clone());
            fresh.push(message);
        }
        fresh
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Vec<HistoryItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_emits_transcribed_messages_in_order() {
        let items = snapshot(json!([
            { "itemId": "a", "type": "message", "role": "user",
              "content": [{ "type": "input_audio", "transcript": "  こんにちは " }] },
            { "itemId": "b", "type": "message", "role": "assistant",
              "content": [{ "type": "output_audio", "transcript": "Hello!" }] }
        ]));

        let mut n = HistoryNormalizer::new();
        let fresh = n.ingest(&items);
        assert_eq!(
            fresh,
            vec![
                ChatMessage { id: "a".into(), role: Role::User, text: "こんにちは".into() },
                ChatMessage { id: "b".into(), role: Role::Assistant, text: "Hello!".into() },
            ]
        );
        assert_eq!(n.messages(), fresh.as_slice());
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let items = snapshot(json!([
            { "itemId": "a", "type": "message", "role": "user",
              "content": [{ "type": "input_audio", "transcript": "one" }] }
        ]));

        let mut n = HistoryNormalizer::new();
        n.ingest(&items);
        let before = n.messages().to_vec();
        assert!(n.ingest(&items).is_empty());
        assert_eq!(n.messages(), before.as_slice());
    }

    #[test]
    fn test_untranscribed_item_is_emitted_later() {
        let pending = snapshot(json!([
            { "itemId": "a", "type": "message", "role": "user",
              "content": [{ "type": "input_audio", "transcript": null }, { "type": "input_audio", "transcript": "   " }] }
        ]));
        let done = snapshot(json!([
            { "itemId": "a", "type": "message", "role": "user",
              "content": [{ "type": "input_audio", "transcript": "finally" }] }
        ]));

        let mut n = HistoryNormalizer::new();
        assert!(n.ingest(&pending).is_empty());
        assert!(n.messages().is_empty());
        assert_eq!(n.ingest(&done)[0].text, "finally");
    }

    #[test]
    fn test_skips_non_message_and_other_roles() {
        let items = snapshot(json!([
            { "itemId": "f", "type": "function_call", "role": "assistant",
              "content": [{ "type": "x", "transcript": "call" }] },
            { "itemId": "s", "type": "message", "role": "system",
              "content": [{ "type": "input_text", "transcript": "sys" }] },
            { "type": "message", "role": "user",
              "content": [{ "type": "input_audio", "transcript": "no id" }] },
            { "itemId": "t", "type": "message", "role": "user",
              "content": [{ "type": "input_text", "text": "typed only" }] }
        ]));

        let mut n = HistoryNormalizer::new();
        assert!(n.ingest(&items).is_empty());
    }

    #[test]
    fn test_falls_back_to_secondary_id() {
        let items = snapshot(json!([
            { "id": "item_9", "type": "message", "role": "assistant",
              "content": [{ "type": "output_audio", "transcript": "hi" }] }
        ]));

        let mut n = HistoryNormalizer::new();
        assert_eq!(n.ingest(&items)[0].id, "item_9");
    }

    #[test]
    fn test_clear_resets_seen_set() {
        let items = snapshot(json!([
            { "itemId": "a", "type": "message", "role": "user",
              "content": [{ "type": "input_audio", "transcript": "one" }] }
        ]));

        let mut n = HistoryNormalizer::new();
        n.ingest(&items);
        n.clear();
        assert!(n.messages().is_empty());
        assert_eq!(n.ingest(&items).len(), 1);
    }
}
