// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use parley_model::Message;
use uuid::Uuid;

/// In-memory conversation history.
///
/// Messages are append-only and keep submission order; nothing is ever
/// removed or deduplicated.  The configured window (`max_messages`) applies
/// only to [`Conversation::request_messages`] — the history itself grows for
/// the lifetime of the panel.
#[derive(Debug)]
pub struct Conversation {
    id: String,
    messages: Vec<Message>,
    max_messages: usize,
}

impl Conversation {
    /// Start a conversation seeded with the system prompt.
    pub fn new(system_prompt: &str, max_messages: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: vec![Message::system(system_prompt)],
            max_messages,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The message list sent to the backend: the full replay, or — when the
    /// history has outgrown `max_messages` — the system message followed by
    /// the most recent messages that fit the window.
    pub fn request_messages(&self) -> Vec<Message> {
        if self.max_messages == 0 || self.messages.len() <= self.max_messages {
            return self.messages.clone();
        }
        let tail = self.max_messages.saturating_sub(1);
        let mut out = Vec::with_capacity(self.max_messages);
        out.push(self.messages[0].clone());
        out.extend(self.messages[self.messages.len() - tail..].iter().cloned());
        out
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
