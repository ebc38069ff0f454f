use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use afrolearn_core::backend::Backend;
use afrolearn_core::language::Language;
use afrolearn_core::mindmap::ConceptGraph;
use afrolearn_core::workspace::{InlineImage, InputMode};
use afrolearn_audio::codec;

use crate::chat::ChatSession;
use crate::prompts;
use crate::rest::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig,
    Part, SpeechConfig, concept_map_schema,
};

/// REST client for the generative endpoints. One instance carries one
/// tutor conversation; the other operations are stateless.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    chat_model: String,
    language: &'static Language,
    chat: Mutex<ChatSession>,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, language: &'static Language) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: crate::DEFAULT_BASE_URL.to_string(),
            api_key,
            chat_model: crate::CHAT_MODEL.to_string(),
            language,
            chat: Mutex::new(ChatSession::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(request)
            .send()
            .await
            .with_context(|| format!("request to {model} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{model} returned {status}: {body}");
        }
        response
            .json::<GenerateContentResponse>()
            .await
            .with_context(|| format!("malformed response from {model}"))
    }
}

#[async_trait]
impl Backend for GeminiClient {
    async fn generate_reply(&self, query: &str, mode: InputMode) -> Result<String> {
        let system_instruction = prompts::tutor_system_instruction(self.language);
        let mut chat = self.chat.lock().await;
        let request =
            chat.build_request(query, mode, &system_instruction, crate::CHAT_TEMPERATURE);
        let response = self.generate(&self.chat_model, &request).await?;
        let text = response
            .text()
            .ok_or_else(|| anyhow!("empty reply from {}", self.chat_model))?;
        chat.record_turn(query, mode, &text);
        tracing::debug!(turns = chat.turn_count(), "conversation advanced");
        Ok(text)
    }

    async fn generate_concept_graph(&self, topic: &str) -> Result<ConceptGraph> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompts::concept_map_prompt(topic))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(concept_map_schema()),
                ..Default::default()
            }),
        };
        let response = self.generate(crate::MAP_MODEL, &request).await?;
        let text = response
            .text()
            .ok_or_else(|| anyhow!("empty concept map response"))?;
        serde_json::from_str(&text).context("concept map response is not valid graph JSON")
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Vec<f32>> {
        let spoken = prompts::truncate_for_tts(text);
        let request = GenerateContentRequest {
            contents: vec![Content::user(spoken)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::voice(crate::TTS_VOICE)),
                ..Default::default()
            }),
        };
        let response = self.generate(crate::TTS_MODEL, &request).await?;
        let inline = response
            .first_inline_data()
            .ok_or_else(|| anyhow!("no audio data returned"))?;
        let pcm16 = base64::engine::general_purpose::STANDARD
            .decode(&inline.data)
            .context("audio payload is not valid base64")?;
        Ok(codec::decode_bytes(&pcm16))
    }

    async fn generate_infographic(&self, topic: &str) -> Result<InlineImage> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompts::infographic_prompt(
                topic,
                self.language,
            ))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: crate::IMAGE_ASPECT_RATIO.to_string(),
                }),
                ..Default::default()
            }),
        };
        let response = self.generate(crate::IMAGE_MODEL, &request).await?;
        let inline = response
            .first_inline_data()
            .ok_or_else(|| anyhow!("no image data returned"))?;
        let mime_type = if inline.mime_type.is_empty() {
            "image/png".to_string()
        } else {
            inline.mime_type.clone()
        };
        let data = base64::engine::general_purpose::STANDARD
            .decode(&inline.data)
            .context("image payload is not valid base64")?;
        Ok(InlineImage { mime_type, data })
    }

    async fn transcribe(&self, audio: Vec<u8>, mime_type: &str) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&audio);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline_data(mime_type, encoded),
                    Part::text(prompts::transcription_instruction(self.language)),
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };
        let response = self.generate(crate::TRANSCRIBE_MODEL, &request).await?;
        let text = response
            .text()
            .ok_or_else(|| anyhow!("empty transcription response"))?;
        Ok(text.trim().to_string())
    }
}
