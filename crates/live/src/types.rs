//! Wire model of the bidirectional live session. Outgoing messages are an
//! externally tagged enum (the tag is the oneof field name); incoming
//! messages are a struct of optional branches, since the server decides
//! which one is present.

use serde::{Deserialize, Serialize};

/// Base64 audio with its MIME descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

// --- Outgoing ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

impl Setup {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            generation_config: None,
            system_instruction: None,
        }
    }

    pub fn with_audio_response(mut self) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .response_modalities = vec!["AUDIO".to_string()];
        self
    }

    pub fn with_voice(mut self, voice_name: impl Into<String>) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .speech_config = Some(SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.into(),
                },
            },
        });
        self
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content {
            parts: vec![TextPart { text: text.into() }],
        });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

// --- Incoming ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
    pub go_away: Option<GoAway>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupComplete {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub interrupted: Option<bool>,
    pub turn_complete: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTurn {
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    pub text: Option<String>,
    pub inline_data: Option<Blob>,
}

/// Server-side notice that the connection will terminate shortly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    pub time_left: Option<String>,
}

impl ServerMessage {
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// The server signalled user barge-in: playback must flush.
    pub fn is_interrupted(&self) -> bool {
        self.server_content
            .as_ref()
            .and_then(|c| c.interrupted)
            .unwrap_or(false)
    }

    pub fn is_turn_complete(&self) -> bool {
        self.server_content
            .as_ref()
            .and_then(|c| c.turn_complete)
            .unwrap_or(false)
    }

    /// Inline audio payloads of this message, in order.
    pub fn audio_chunks(&self) -> Vec<&Blob> {
        self.server_content
            .iter()
            .flat_map(|c| c.model_turn.iter())
            .flat_map(|t| t.parts.iter())
            .filter_map(|p| p.inline_data.as_ref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_serializes_under_its_oneof_tag() {
        let setup = Setup::new("models/tutor-live")
            .with_audio_response()
            .with_voice("Kore")
            .with_system_instruction("Be friendly.");
        let json = serde_json::to_value(ClientMessage::Setup(setup)).unwrap();
        assert_eq!(json["setup"]["model"], "models/tutor-live");
        assert_eq!(json["setup"]["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]
                ["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        assert_eq!(
            json["setup"]["systemInstruction"]["parts"][0]["text"],
            "Be friendly."
        );
    }

    #[test]
    fn realtime_input_carries_media_chunks() {
        let message = ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![Blob {
                mime_type: "audio/pcm;rate=16000".to_string(),
                data: "AAAA".to_string(),
            }],
        });
        let json = serde_json::to_value(message).unwrap();
        assert_eq!(
            json["realtimeInput"]["mediaChunks"][0]["mimeType"],
            "audio/pcm;rate=16000"
        );
        assert_eq!(json["realtimeInput"]["mediaChunks"][0]["data"], "AAAA");
    }

    #[test]
    fn audio_message_parses_and_exposes_chunks() {
        let message: ServerMessage = serde_json::from_str(
            r#"{"serverContent": {"modelTurn": {"parts": [
                {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "UENN"}},
                {"text": "transcript"}
            ]}}}"#,
        )
        .unwrap();
        let chunks = message.audio_chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data, "UENN");
        assert!(!message.is_interrupted());
        assert!(!message.is_turn_complete());
    }

    #[test]
    fn interruption_and_turn_complete_parse() {
        let message: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"interrupted": true}}"#).unwrap();
        assert!(message.is_interrupted());
        assert!(message.audio_chunks().is_empty());

        let message: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"turnComplete": true}}"#).unwrap();
        assert!(message.is_turn_complete());
    }

    #[test]
    fn setup_complete_parses() {
        let message: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(message.is_setup_complete());
    }

    #[test]
    fn unknown_branches_do_not_break_parsing() {
        let message: ServerMessage =
            serde_json::from_str(r#"{"usageMetadata": {"totalTokenCount": 42}}"#).unwrap();
        assert!(!message.is_setup_complete());
        assert!(message.audio_chunks().is_empty());
    }
}
