use std::fmt;

use chrono::{DateTime, Utc};

/// Store-assigned message identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Returns true when the message was written under `username`.
    ///
    /// Identity is the display name only; two people joining with the same
    /// name see each other's messages as their own.
    pub fn is_from(&self, username: &str) -> bool {
        self.username == username
    }
}

/// Insert record: everything else is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub username: String,
    pub content: String,
}
