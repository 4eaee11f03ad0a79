use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Ordered, append-only conversation record.
///
/// Entries are only added as a full user/assistant exchange. When a bound is
/// set, whole exchanges are dropped from the front until the record fits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
    max_turns: Option<usize>,
}

impl ConversationHistory {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A `max_turns` of zero means unbounded.
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self { turns: Vec::new(), max_turns: (max_turns > 0).then_some(max_turns) }
    }

    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(Turn::user(user));
        self.turns.push(Turn::assistant(assistant));
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        let Some(max_turns) = self.max_turns else {
            return;
        };
        // The newest exchange always survives, even under a bound of one.
        while self.turns.len() > max_turns.max(2) {
            self.turns.drain(..2);
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }

    /// `role: content` lines, oldest first.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
