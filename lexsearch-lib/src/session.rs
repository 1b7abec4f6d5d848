//! Conversation memory
//!
//! A [`Conversation`] is owned by whoever drives the chat (the HTTP layer
//! keeps one per session id); the retrieval core never sees it.

use serde::{Deserialize, Serialize};

/// Turns kept by default: the last three exchanges.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Append-only chat log retaining a fixed suffix of turns.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
    window: usize,
}

impl Conversation {
    /// A conversation keeping at most `window` turns (at least one).
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            turns: Vec::new(),
            window: window.max(1),
        }
    }

    /// Append a turn, dropping the oldest once the window is full.
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            text: text.into(),
        });
        if self.turns.len() > self.window {
            let excess = self.turns.len() - self.window;
            self.turns.drain(..excess);
        }
    }

    /// Record a user question and the answer given to it.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.push(Role::User, question);
        self.push(Role::Assistant, answer);
    }

    /// Retained turns, oldest first.
    pub fn recent(&self) -> &[ChatTurn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}
