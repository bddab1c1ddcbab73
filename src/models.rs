use serde::{Deserialize, Serialize};

/// One page of a `messages.list` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    pub message_ids: Vec<String>,
    /// Continuation token; empty when this is the last page
    pub next_page_token: String,
}

impl MessagePage {
    pub fn has_more(&self) -> bool {
        !self.next_page_token.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

/// Metadata-only view of a message: its ID and top-level headers in API order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub id: String,
    pub headers: Vec<MessageHeader>,
}

impl MessageMetadata {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(MessageHeader {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// First header whose name matches exactly (case-sensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}
