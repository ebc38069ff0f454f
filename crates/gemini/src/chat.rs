use afrolearn_core::workspace::InputMode;

use crate::prompts;
use crate::rest::{Content, GenerateContentRequest, GenerationConfig};

/// One persistent tutor conversation. The accumulated history rides along
/// with every request; a turn only enters the history once the model's
/// reply arrived, so a failed request leaves the conversation unchanged.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    /// Builds the next request: full history plus the new user turn with
    /// its mode-specific style block appended.
    pub fn build_request(
        &self,
        query: &str,
        mode: InputMode,
        system_instruction: &str,
        temperature: f32,
    ) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(Content::user(prompts::with_style(query, mode)));
        GenerateContentRequest {
            contents,
            system_instruction: Some(Content::system(system_instruction)),
            generation_config: Some(GenerationConfig {
                temperature: Some(temperature),
                ..Default::default()
            }),
        }
    }

    /// Commits a completed exchange to the history.
    pub fn record_turn(&mut self, query: &str, mode: InputMode, reply: &str) {
        self.history.push(Content::user(prompts::with_style(query, mode)));
        self.history.push(Content::model(reply));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_the_full_history() {
        let mut chat = ChatSession::new();
        chat.record_turn("What is rain?", InputMode::Text, "Water falling from clouds.");

        let request = chat.build_request("Why does it fall?", InputMode::Text, "be a tutor", 0.7);
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role.as_deref(), Some("user"));
        assert_eq!(request.contents[1].role.as_deref(), Some("model"));
        assert_eq!(request.contents[2].role.as_deref(), Some("user"));
        assert!(
            request.contents[2].parts[0]
                .text
                .as_deref()
                .unwrap()
                .starts_with("Why does it fall?")
        );
        assert_eq!(
            request.generation_config.as_ref().unwrap().temperature,
            Some(0.7)
        );
    }

    #[test]
    fn failed_exchanges_never_enter_the_history() {
        let chat = ChatSession::new();
        // Build a request but never record it.
        let _ = chat.build_request("lost question", InputMode::Voice, "sys", 0.7);
        assert_eq!(chat.turn_count(), 0);
    }
}
