// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single text part in a multi-part message.
///
/// Some chat-completion APIs return the assistant content as an array of
/// typed parts instead of one string; parley normalises both shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// The content of a message: a plain string (most messages) or a list of
/// text parts (the alternate wire shape some APIs produce).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single message in the conversation history.  Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: MessageContent::Text(text.into()) }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: MessageContent::Text(text.into()) }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: MessageContent::Text(text.into()) }
    }

    /// Return the plain text of this message, if it is a single text value.
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(t) => Some(t),
            MessageContent::Parts(parts) if parts.len() == 1 => {
                let ContentPart::Text { text } = &parts[0];
                Some(text)
            }
            _ => None,
        }
    }

    /// Flatten the content to one string, joining multiple parts with
    /// newlines.  Used to normalise responses before segmentation.
    pub fn flattened_text(&self) -> String {
        match &self.content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|p| {
                    let ContentPart::Text { text } = p;
                    text.as_str()
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Request sent to a chat backend.  The full conversation is replayed on
/// every turn; there is no incremental protocol.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub stream: bool,
}

/// A single streamed event from the backend.
#[derive(Debug, Clone)]
pub enum ResponseEvent {
    /// A text delta streamed from the model.  Non-streaming backends emit the
    /// whole reply as one delta.
    TextDelta(String),
    /// The stream finished normally
    Done,
    /// A recoverable error (non-fatal warning)
    Error(String),
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
