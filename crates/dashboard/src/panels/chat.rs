//! Detective chat panel

use casedesk_common::errors::AppError;
use casedesk_common::models::ChatTranscript;

#[derive(Debug, Clone, Default)]
pub struct ChatPanel {
    transcript: ChatTranscript,
    waiting: usize,
}

impl ChatPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the question right away and return it for sending.
    /// Blank input is ignored and nothing is returned.
    pub fn send(&mut self, input: &str) -> Option<String> {
        let question = input.trim();
        if question.is_empty() {
            return None;
        }
        self.transcript.push_user(question);
        self.waiting += 1;
        Some(question.to_string())
    }

    /// The user entry stays in the transcript whatever the outcome
    pub fn answered(&mut self, result: Result<String, AppError>) -> Result<(), AppError> {
        self.waiting = self.waiting.saturating_sub(1);
        let answer = result?;
        self.transcript.push_agent(answer);
        Ok(())
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casedesk_common::models::ChatRole;

    #[test]
    fn test_blank_input_is_noop() {
        let mut panel = ChatPanel::new();
        assert_eq!(panel.send("   "), None);
        assert!(panel.transcript().is_empty());
        assert!(!panel.is_waiting());
    }

    #[test]
    fn test_user_entry_is_optimistic_and_kept_on_failure() {
        let mut panel = ChatPanel::new();
        assert_eq!(panel.send(" Where was the van? ").as_deref(), Some("Where was the van?"));
        assert_eq!(panel.transcript().len(), 1);
        assert!(panel.is_waiting());

        let err = AppError::Backend { status: 500, message: "down".into() };
        assert!(panel.answered(Err(err)).is_err());
        assert_eq!(panel.transcript().len(), 1);
        assert_eq!(panel.transcript().entries()[0].role, ChatRole::User);
        assert!(!panel.is_waiting());

        panel.send("Again?");
        panel.answered(Ok("Parked on Elm St.".into())).unwrap();
        assert_eq!(panel.transcript().last().unwrap().role, ChatRole::Agent);
    }
}
