//! In-process conversation memory.
//!
//! A [`ConversationMemory`] is the ordered turn log for one conversation. [`SessionStore`] keys
//! those logs by session id and evicts idle ones.

mod sessions;

pub use sessions::{DEFAULT_SESSION_ID, SessionStore};

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person asking questions.
    User,
    /// The model's answer.
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    role: Role,
    text: String,
}

impl ChatTurn {
    /// A turn authored by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// A turn authored by the assistant.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    /// Author of the turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Message body.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered log of turns; insertion order is conversation order.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ChatTurn>,
    max_turns: Option<usize>,
}

impl ConversationMemory {
    /// Create an empty, unbounded memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty memory that keeps at most `max_turns` turns.
    ///
    /// Oldest exchanges are dropped first, a full user/assistant pair at a time. The latest
    /// exchange is always kept, so caps below two behave like two.
    pub fn with_max_turns(max_turns: Option<usize>) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    /// Add a turn to the end of the log.
    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
        self.enforce_cap();
    }

    /// Add a user turn followed by its assistant turn.
    pub fn append_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn::user(question));
        self.turns.push(ChatTurn::assistant(answer));
        self.enforce_cap();
    }

    /// All turns in insertion order.
    pub fn snapshot(&self) -> Vec<ChatTurn> {
        self.turns.clone()
    }

    /// Drop every turn.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Number of turns held.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log holds no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn enforce_cap(&mut self) {
        let Some(max) = self.max_turns.map(|max| max.max(2)) else {
            return;
        };
        if self.turns.len() <= max {
            return;
        }
        let mut drop = self.turns.len() - max;
        // Never leave an assistant turn without the question that produced it.
        while drop < self.turns.len() && self.turns[drop].role == Role::Assistant {
            drop += 1;
        }
        self.turns.drain(..drop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut memory = ConversationMemory::new();
        memory.append(ChatTurn::user("first"));
        memory.append(ChatTurn::assistant("second"));
        memory.append_exchange("third", "fourth");

        let texts: Vec<_> = memory
            .snapshot()
            .iter()
            .map(|turn| turn.text().to_string())
            .collect();
        assert_eq!(texts, ["first", "second", "third", "fourth"]);
        assert_eq!(memory.snapshot()[2].role(), Role::User);
        assert_eq!(memory.snapshot()[3].role(), Role::Assistant);
    }

    #[test]
    fn reset_returns_to_empty() {
        let mut memory = ConversationMemory::new();
        memory.append_exchange("q", "a");
        memory.reset();
        assert!(memory.is_empty());
        memory.reset();
        assert_eq!(memory.len(), 0);
    }

    #[test]
    fn unbounded_by_default() {
        let mut memory = ConversationMemory::new();
        for index in 0..500 {
            memory.append_exchange(format!("q{index}"), format!("a{index}"));
        }
        assert_eq!(memory.len(), 1000);
    }

    #[test]
    fn cap_drops_whole_exchanges() {
        let mut memory = ConversationMemory::with_max_turns(Some(3));
        memory.append_exchange("q1", "a1");
        memory.append_exchange("q2", "a2");

        let snapshot = memory.snapshot();
        assert_eq!(snapshot, vec![ChatTurn::user("q2"), ChatTurn::assistant("a2")]);
    }

    #[test]
    fn cap_keeps_latest_exchanges() {
        let mut memory = ConversationMemory::with_max_turns(Some(4));
        for index in 1..=3 {
            memory.append_exchange(format!("q{index}"), format!("a{index}"));
        }
        let texts: Vec<_> = memory
            .snapshot()
            .iter()
            .map(|turn| turn.text().to_string())
            .collect();
        assert_eq!(texts, ["q2", "a2", "q3", "a3"]);
    }

    #[test]
    fn tiny_caps_still_keep_the_latest_exchange() {
        for cap in [0, 1, 2] {
            let mut memory = ConversationMemory::with_max_turns(Some(cap));
            memory.append_exchange("q1", "a1");
            assert_eq!(memory.len(), 2, "cap {cap}");

            memory.append_exchange("q2", "a2");
            assert_eq!(
                memory.snapshot(),
                vec![ChatTurn::user("q2"), ChatTurn::assistant("a2")],
                "cap {cap}"
            );
        }
    }
}
