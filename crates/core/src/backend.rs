use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::mindmap::ConceptGraph;
use crate::workspace::{InlineImage, InputMode};

// The `Backend` trait is the seam between the session logic and the hosted
// generative service. `SessionController` depends on this abstraction, so
// unit tests drive it with a mock instead of the network.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Backend: Send + Sync {
    /// One conversational turn. The implementation owns the conversation
    /// history and appends the style instruction matching `mode`.
    async fn generate_reply(&self, query: &str, mode: InputMode) -> Result<String>;

    /// Structured concept graph for a topic, at most 15 nodes.
    async fn generate_concept_graph(&self, topic: &str) -> Result<ConceptGraph>;

    /// Synthesized narration for the given text as 24 kHz mono samples.
    async fn synthesize_speech(&self, text: &str) -> Result<Vec<f32>>;

    /// Rendered infographic poster for a topic.
    async fn generate_infographic(&self, topic: &str) -> Result<InlineImage>;

    /// Corrected plain-text transcription of a recorded clip.
    async fn transcribe(&self, audio: Vec<u8>, mime_type: &str) -> Result<String>;
}
