use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub prompt: String,
    pub response: String,
}

/// Append-only record of one session's exchanges, in submission order.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    entries: Vec<ConversationEntry>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> &ConversationEntry {
        self.entries.push(ConversationEntry {
            prompt: prompt.into(),
            response: response.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn all(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
