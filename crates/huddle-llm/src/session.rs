use crate::types::{Role, Turn};

/// Running conversation with the model.
///
/// The session is plain data: [`crate::Generator::send_in_session`] sends the
/// whole history with each prompt and records the exchange on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSession {
    history: Vec<Turn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a session with prior user prompts only.
    ///
    /// Earlier model replies are left out; they are regenerated context, not input.
    pub fn from_user_prompts<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            history: prompts.into_iter().map(|p| Turn::user(p)).collect(),
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Record a user prompt that was not sent through this session (e.g. from another participant)
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(Turn::user(text));
    }

    pub(crate) fn record_exchange(&mut self, prompt: &str, reply: &str) {
        self.history.push(Turn::user(prompt));
        self.history.push(Turn::model(reply));
    }

    /// Turns for the next request: the history plus the new prompt
    pub(crate) fn turns_with(&self, prompt: &str) -> Vec<Turn> {
        let mut turns = self.history.clone();
        turns.push(Turn::user(prompt));
        turns
    }

    pub fn user_turns(&self) -> usize {
        self.history.iter().filter(|t| t.role == Role::User).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_session_holds_only_user_turns() {
        let session = ChatSession::from_user_prompts(["first", "second"]);
        assert_eq!(session.len(), 2);
        assert_eq!(session.user_turns(), 2);
    }

    #[test]
    fn test_turns_with_does_not_mutate() {
        let session = ChatSession::from_user_prompts(["first"]);
        let turns = session.turns_with("next");
        assert_eq!(turns.len(), 2);
        assert_eq!(session.len(), 1);
    }
}
