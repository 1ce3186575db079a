//! OpenAI TTS Client
//!
//! 合成: POST {base_url}/v1/audio/speech（Bearer 认证）
//! 音色集合固定；支持 instructions 的模型使用人设提示控制语气

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::common::{build_http_client, check_status, ensure_text};
use crate::application::ports::{
    AudioFormat, ProviderError, SynthesisRequest, SynthesizedAudio, TtsProviderPort,
};
use crate::domain::voice::{builtin_catalog, is_known_voice, ProviderKind, Voice};

/// OpenAI 客户端配置
#[derive(Debug, Clone)]
pub struct OpenAiTtsClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// mp3 / wav / opus
    pub response_format: String,
    pub timeout_secs: u64,
}

impl OpenAiTtsClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini-tts".to_string(),
            response_format: "mp3".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

/// OpenAI TTS 客户端
pub struct OpenAiTtsClient {
    client: Client,
    config: OpenAiTtsClientConfig,
    format: AudioFormat,
}

impl OpenAiTtsClient {
    pub fn new(config: OpenAiTtsClientConfig) -> Result<Self, ProviderError> {
        let format = response_format_to_audio(&config.response_format).ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "Unsupported OpenAI response format: {}",
                config.response_format
            ))
        })?;
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self {
            client,
            config,
            format,
        })
    }
}

fn response_format_to_audio(format: &str) -> Option<AudioFormat> {
    match format.trim().to_lowercase().as_str() {
        "mp3" => Some(AudioFormat::Mp3),
        "wav" => Some(AudioFormat::Wav),
        // opus 以 Ogg 容器返回
        "opus" => Some(AudioFormat::Ogg),
        _ => None,
    }
}

#[async_trait]
impl TtsProviderPort for OpenAiTtsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn supports_persona(&self) -> bool {
        true
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let voices = builtin_catalog(ProviderKind::OpenAi);
        tracing::info!(voices = voices.len(), "OpenAI voice catalog loaded");
        Ok(voices)
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        let text = ensure_text(&request.text)?;
        let voice = request.voice_id.as_str();
        if !is_known_voice(ProviderKind::OpenAi, voice) {
            return Err(ProviderError::VoiceNotFound(voice.to_string()));
        }

        let body = SpeechBody {
            model: &self.config.model,
            input: text,
            voice,
            response_format: &self.config.response_format,
            instructions: request.persona_instructions.as_deref(),
        };

        tracing::debug!(
            voice_id = %voice,
            model = %self.config.model,
            text_len = text.len(),
            has_persona = body.instructions.is_some(),
            "Sending OpenAI speech request"
        );

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, None).await?;

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();
        if audio_data.is_empty() {
            return Err(ProviderError::InvalidResponse("Empty audio".to_string()));
        }

        tracing::info!(
            voice_id = %voice,
            audio_size = audio_data.len(),
            "OpenAI synthesis completed"
        );

        Ok(SynthesizedAudio {
            audio_data,
            format: self.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::VoiceId;

    #[test]
    fn test_body_includes_persona_only_when_present() {
        let body = SpeechBody {
            model: "gpt-4o-mini-tts",
            input: "Hi",
            voice: "fable",
            response_format: "mp3",
            instructions: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("instructions").is_none());

        let body = SpeechBody {
            instructions: Some("Speak as a weary storyteller"),
            ..body
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["instructions"], "Speak as a weary storyteller");
    }

    #[tokio::test]
    async fn test_fixed_catalog() {
        let client = OpenAiTtsClient::new(OpenAiTtsClientConfig::new("key")).unwrap();
        let voices = client.fetch_voices().await.unwrap();
        assert!(voices.iter().any(|v| v.id().as_str() == "nova"));
        assert!(client.supports_persona());
    }

    #[tokio::test]
    async fn test_unknown_voice_rejected_before_request() {
        let client = OpenAiTtsClient::new(OpenAiTtsClientConfig::new("key")).unwrap();
        let err = client
            .synthesize(SynthesisRequest::new("Hello", VoiceId::new("Kore").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::VoiceNotFound(_)));
    }

    #[test]
    fn test_response_format_mapping() {
        assert_eq!(response_format_to_audio("opus"), Some(AudioFormat::Ogg));
        assert_eq!(response_format_to_audio("pcm"), None);
    }
}
