mod chat;
mod client;
pub mod prompts;
pub mod rest;

pub use chat::ChatSession;
pub use client::GeminiClient;

/// Conversational model backing the tutor chat.
pub const CHAT_MODEL: &str = "gemini-3-pro-preview";
/// Model answering the schema-constrained concept-map request.
pub const MAP_MODEL: &str = "gemini-2.5-flash";
/// Text-to-speech model.
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
/// Image generation model.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
/// Transcription model.
pub const TRANSCRIBE_MODEL: &str = "gemini-2.5-flash";

/// Prebuilt voice used for all synthesized speech.
pub const TTS_VOICE: &str = "Kore";
/// Infographic posters are vertical.
pub const IMAGE_ASPECT_RATIO: &str = "3:4";
/// Sampling temperature of the tutor chat.
pub const CHAT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
