/// In-memory conversation summaries (one entry per conversation id)
use crate::timefmt::parse_timestamp;
use crate::types::ChatMessage;
use std::collections::HashMap;

/// Summary of one conversation thread, as shown in the contact list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub conversation_id: String,
    /// Sender label of the message that created the entry
    pub display_name: String,
    pub last_message_text: String,
    /// Timestamp of the most recently processed message, not necessarily the newest
    pub last_message_timestamp: String,
    pub platform_label: String,
}

/// Conversation map keyed by id, remembering first-seen order for ties
#[derive(Debug, Clone, Default)]
pub struct ConversationBook {
    entries: Vec<Conversation>,
    index: HashMap<String, usize>,
}

impl ConversationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the entry for `msg.conversation_id`.
    ///
    /// Returns `true` if the entry was created. An existing entry keeps its
    /// display name and platform; the last-message fields are overwritten
    /// unconditionally (last processed wins).
    pub fn record(&mut self, msg: &ChatMessage, default_platform: &str) -> bool {
        if let Some(&i) = self.index.get(&msg.conversation_id) {
            let entry = &mut self.entries[i];
            entry.last_message_text = msg.text.clone();
            entry.last_message_timestamp = msg.timestamp.clone();
            return false;
        }

        let platform_label = msg
            .platform
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| default_platform.to_string());
        self.index
            .insert(msg.conversation_id.clone(), self.entries.len());
        self.entries.push(Conversation {
            conversation_id: msg.conversation_id.clone(),
            display_name: msg.sender.clone(),
            last_message_text: msg.text.clone(),
            last_message_timestamp: msg.timestamp.clone(),
            platform_label,
        });
        true
    }

    pub fn get(&self, conversation_id: &str) -> Option<&Conversation> {
        self.index.get(conversation_id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered most recent first. Ties keep first-seen order;
    /// unparseable timestamps go last.
    pub fn sorted(&self) -> Vec<&Conversation> {
        let mut sorted: Vec<(Option<_>, &Conversation)> = self
            .entries
            .iter()
            .map(|c| (parse_timestamp(&c.last_message_timestamp), c))
            .collect();
        sorted.sort_by(|a, b| b.0.cmp(&a.0));
        sorted.into_iter().map(|(_, c)| c).collect()
    }
}
