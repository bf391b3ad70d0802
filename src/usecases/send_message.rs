//! Validation of outgoing chat messages.
//!
//! Turns what the user typed into the insert record handed to the message
//! store. Nothing reaches the store unless this check passes.

use crate::domain::message::NewMessage;

/// Command to post a message to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    EmptyMessage,
    /// No display name to send under.
    MissingUsername,
    /// Sending is only possible while joined.
    NotJoined,
}

/// Builds the insert record, trimming the content.
///
/// # Errors
/// Returns `SendMessageError::EmptyMessage` if the content is empty or whitespace,
/// `SendMessageError::MissingUsername` if the username is.
pub fn prepare_message(command: SendMessageCommand) -> Result<NewMessage, SendMessageError> {
    let content = command.content.trim();
    if content.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    let username = command.username.trim();
    if username.is_empty() {
        return Err(SendMessageError::MissingUsername);
    }

    Ok(NewMessage {
        username: username.to_owned(),
        content: content.to_owned(),
    })
}
