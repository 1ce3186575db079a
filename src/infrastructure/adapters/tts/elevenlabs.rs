//! ElevenLabs TTS Client
//!
//! 音色目录: GET {base_url}/v1/voices
//! 合成: POST {base_url}/v1/text-to-speech/{voice_id}?output_format=...
//! 认证头 `xi-api-key`；不支持人设提示

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::common::{build_http_client, check_status, ensure_text};
use crate::application::ports::{
    AudioFormat, ProviderError, SynthesisRequest, SynthesizedAudio, TtsProviderPort,
};
use crate::domain::voice::{Gender, ProviderKind, Voice, VoiceId};

const API_KEY_HEADER: &str = "xi-api-key";

/// 视为英语音色的口音标签
const ENGLISH_ACCENTS: &[&str] = &[
    "american",
    "british",
    "english",
    "australian",
    "irish",
    "uk",
    "us",
];

/// ElevenLabs 客户端配置
#[derive(Debug, Clone)]
pub struct ElevenLabsClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    pub output_format: String,
    pub timeout_secs: u64,
}

impl ElevenLabsClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.elevenlabs.io".to_string(),
            model_id: "eleven_turbo_v2".to_string(),
            output_format: "mp3_44100_128".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceDto>,
}

#[derive(Debug, Deserialize)]
struct VoiceDto {
    voice_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

impl VoiceDto {
    fn label(&self, key: &str) -> String {
        self.labels
            .get(key)
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default()
    }

    fn is_english(&self) -> bool {
        let accent = self.label("accent");
        let use_case = self.label("use case");
        ENGLISH_ACCENTS.contains(&accent.as_str())
            || use_case.contains("narrat")
            || use_case.contains("audiobook")
    }

    /// 生成类音色不稳定，跳过
    fn is_usable(&self) -> bool {
        !matches!(self.category.as_deref(), Some("generated"))
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs TTS 客户端
pub struct ElevenLabsClient {
    client: Client,
    config: ElevenLabsClientConfig,
    format: AudioFormat,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsClientConfig) -> Result<Self, ProviderError> {
        let format = output_format_to_audio(&config.output_format).ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "Unsupported ElevenLabs output format: {}",
                config.output_format
            ))
        })?;
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self {
            client,
            config,
            format,
        })
    }

    fn voices_url(&self) -> String {
        format!("{}/v1/voices", self.config.base_url)
    }

    fn synthesize_url(&self, voice_id: &VoiceId) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url,
            voice_id.as_str()
        )
    }
}

/// 只接受可直接播放的容器格式
fn output_format_to_audio(output_format: &str) -> Option<AudioFormat> {
    if output_format.starts_with("mp3_") {
        Some(AudioFormat::Mp3)
    } else if output_format.starts_with("wav_") {
        Some(AudioFormat::Wav)
    } else {
        None
    }
}

/// 目录中可用于分配的英语音色（保持返回顺序）
fn parse_catalog(body: VoicesResponse) -> Vec<Voice> {
    body.voices
        .into_iter()
        .filter(|v| v.is_usable() && v.is_english())
        .filter_map(|v| {
            let id = VoiceId::new(v.voice_id.as_deref().unwrap_or_default()).ok()?;
            let gender = Gender::parse_lenient(&v.label("gender"));
            let name = v.name.clone().unwrap_or_else(|| "Unnamed Voice".to_string());
            Some(Voice::new(id, name, gender, ProviderKind::ElevenLabs))
        })
        .collect()
}

#[async_trait]
impl TtsProviderPort for ElevenLabsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ElevenLabs
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        tracing::debug!(url = %self.voices_url(), "Fetching ElevenLabs voices");

        let response = self
            .client
            .get(self.voices_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;
        let response = check_status(response, None).await?;

        let body: VoicesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let total = body.voices.len();
        let voices = parse_catalog(body);

        tracing::info!(
            total = total,
            english = voices.len(),
            "ElevenLabs voice catalog fetched"
        );
        Ok(voices)
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        let text = ensure_text(&request.text)?;

        tracing::debug!(
            voice_id = %request.voice_id,
            text_len = text.len(),
            model = %self.config.model_id,
            "Sending ElevenLabs synthesis request"
        );

        let response = self
            .client
            .post(self.synthesize_url(&request.voice_id))
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(&[("output_format", self.config.output_format.as_str())])
            .json(&SynthesizeBody {
                text,
                model_id: &self.config.model_id,
            })
            .send()
            .await?;
        let response = check_status(response, Some(request.voice_id.as_str())).await?;

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();
        if audio_data.is_empty() {
            return Err(ProviderError::InvalidResponse("Empty audio".to_string()));
        }

        tracing::info!(
            voice_id = %request.voice_id,
            audio_size = audio_data.len(),
            "ElevenLabs synthesis completed"
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

    #[test]
    fn test_catalog_keeps_english_and_skips_generated() {
        let body: VoicesResponse = serde_json::from_str(
            r#"{"voices": [
                {"voice_id": "v1", "name": "George", "category": "premade",
                 "labels": {"gender": "male", "accent": "British"}},
                {"voice_id": "v2", "name": "Gen", "category": "generated",
                 "labels": {"gender": "female", "accent": "american"}},
                {"voice_id": "v3", "name": "Hans", "category": "premade",
                 "labels": {"gender": "male", "accent": "german"}},
                {"voice_id": "v4", "name": "Narrator", "category": "professional",
                 "labels": {"gender": "female", "accent": "german", "use case": "Narration"}},
                {"voice_id": "v5", "name": "Mystery", "category": "cloned",
                 "labels": {"accent": "us"}},
                {"name": "No Id", "labels": {"accent": "us"}}
            ]}"#,
        )
        .unwrap();

        let voices = parse_catalog(body);
        let ids: Vec<_> = voices.iter().map(|v| v.id().as_str()).collect();
        assert_eq!(ids, vec!["v1", "v4", "v5"]);
        assert_eq!(voices[0].gender(), Gender::Male);
        assert_eq!(voices[1].gender(), Gender::Female);
        assert_eq!(voices[2].gender(), Gender::Unknown);
    }

    #[test]
    fn test_output_format_mapping() {
        assert_eq!(output_format_to_audio("mp3_44100_128"), Some(AudioFormat::Mp3));
        assert_eq!(output_format_to_audio("wav_44100"), Some(AudioFormat::Wav));
        assert_eq!(output_format_to_audio("pcm_16000"), None);
    }

    #[test]
    fn test_rejects_raw_pcm_format() {
        let mut config = ElevenLabsClientConfig::new("key");
        config.output_format = "ulaw_8000".to_string();
        assert!(ElevenLabsClient::new(config).is_err());
    }

    #[test]
    fn test_persona_not_supported() {
        let client = ElevenLabsClient::new(ElevenLabsClientConfig::new("key")).unwrap();
        assert!(!client.supports_persona());
        assert_eq!(client.kind(), ProviderKind::ElevenLabs);
    }
}
