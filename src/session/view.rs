use serde::Serialize;

use crate::conversation::ConversationEntry;

pub const PAGE_TITLE: &str = "Chat with the Embedchain AI Assistant";
pub const PAGE_CAPTION: &str =
    "This app uses the Embedchain library to provide an AI-powered chatbot.";

/// One-shot message shown on the next render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(msg) | Notice::Warning(msg) | Notice::Error(msg) => msg,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    /// 1-based position in the conversation.
    pub number: usize,
    pub prompt: String,
    pub response: String,
}

impl HistoryItem {
    pub fn numbered(entries: &[ConversationEntry]) -> Vec<HistoryItem> {
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| HistoryItem {
                number: index + 1,
                prompt: entry.prompt.clone(),
                response: entry.response.clone(),
            })
            .collect()
    }
}

/// Everything the page needs; rendering reads nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub title: &'static str,
    pub caption: &'static str,
    pub ready: bool,
    pub has_default_openai_key: bool,
    pub needs_embedchain_key: bool,
    pub models: Vec<String>,
    pub selected_model: String,
    pub latest_response: Option<String>,
    pub history: Vec<HistoryItem>,
    pub notice: Option<Notice>,
}
