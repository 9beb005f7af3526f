//! Ordered conversation history rebuilt from server events.

use realtime_voice_core::history::{ContentPart, HistoryItem};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Conversation {
    items: Vec<HistoryItem>,
}

impl Conversation {
    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.stable_id() == Some(id))
    }

    /// Inserts or replaces an item. New items go right after
    /// `previous_item_id` when it is known, else at the end.
    ///
    /// Transcripts already received for a replaced item are kept when the
    /// incoming copy has none.
    pub fn upsert(&mut self, mut item: HistoryItem, previous_item_id: Option<&str>) {
        let Some(id) = item.stable_id().map(str::to_string) else {
            return;
        };

        if let Some(pos) = self.position(&id) {
            let old = &self.items[pos];
            if let Some(parts) = item.content.as_mut() {
                for (idx, part) in parts.iter_mut().enumerate() {
                    if part.transcript.is_none() {
                        part.transcript = old
                            .parts()
                            .get(idx)
                            .and_then(|p| p.transcript.clone());
                    }
                }
            }
            self.items[pos] = item;
            return;
        }

        match previous_item_id.and_then(|prev| self.position(prev)) {
            Some(prev) => self.items.insert(prev + 1, item),
            None => self.items.push(item),
        }
    }

    /// Records a finished transcript.
    ///
    /// The index may name an existing part or the next one; anything further
    /// out is ignored. Returns `false` when nothing was recorded.
    pub fn set_transcript(&mut self, item_id: &str, content_index: usize, transcript: String) -> bool {
        let Some(pos) = self.position(item_id) else {
            return false;
        };
        let parts = self.items[pos].content.get_or_insert_with(Vec::new);
        if content_index == parts.len() {
            parts.push(ContentPart::default());
        }
        match parts.get_mut(content_index) {
            Some(part) => {
                part.transcript = Some(transcript);
                true
            }
            None => {
                debug!(%item_id, content_index, "Transcript index out of range");
                false
            }
        }
    }

    pub fn remove(&mut self, item_id: &str) -> bool {
        match self.position(item_id) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Name of the function called by `call_id`, if its item is known.
    pub fn function_name(&self, call_id: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|i| i.call_id.as_deref() == Some(call_id))
            .and_then(|i| i.name.as_deref())
    }

    pub fn snapshot(&self) -> Vec<HistoryItem> {
        self.items.clone()
    }
}
