//! Google Cloud TTS Client
//!
//! 音色目录: GET {base_url}/v1/voices?languageCode=...
//! 合成: POST {base_url}/v1/text:synthesize，音频以 base64 返回
//! 使用 API key 认证；不支持人设提示

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::common::{build_http_client, check_status, ensure_text};
use crate::application::ports::{
    AudioFormat, ProviderError, SynthesisRequest, SynthesizedAudio, TtsProviderPort,
};
use crate::domain::voice::{Gender, ProviderKind, Voice, VoiceId};

/// Google 客户端配置
#[derive(Debug, Clone)]
pub struct GoogleTtsClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub language_code: String,
    /// MP3 / LINEAR16 / OGG_OPUS
    pub audio_encoding: String,
    pub timeout_secs: u64,
}

impl GoogleTtsClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://texttospeech.googleapis.com".to_string(),
            language_code: "en-US".to_string(),
            audio_encoding: "MP3".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceDto {
    name: String,
    #[serde(default)]
    language_codes: Vec<String>,
    #[serde(default)]
    ssml_gender: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfigDto<'a>,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfigDto<'a> {
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

/// Google Cloud TTS 客户端
pub struct GoogleTtsClient {
    client: Client,
    config: GoogleTtsClientConfig,
    format: AudioFormat,
}

impl GoogleTtsClient {
    pub fn new(config: GoogleTtsClientConfig) -> Result<Self, ProviderError> {
        let format = encoding_to_audio(&config.audio_encoding).ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "Unsupported Google audio encoding: {}",
                config.audio_encoding
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

fn encoding_to_audio(encoding: &str) -> Option<AudioFormat> {
    match encoding.trim().to_uppercase().as_str() {
        "MP3" => Some(AudioFormat::Mp3),
        // LINEAR16 响应自带 WAV 头
        "LINEAR16" => Some(AudioFormat::Wav),
        "OGG_OPUS" => Some(AudioFormat::Ogg),
        _ => None,
    }
}

/// 从音色名解析语言代码，例如 "en-US-Wavenet-D" -> "en-US"
fn language_from_voice(voice_id: &str) -> Option<String> {
    let mut parts = voice_id.split('-');
    let lang = parts.next()?;
    let region = parts.next()?;
    let valid = lang.len() == 2
        && region.len() == 2
        && lang.chars().all(|c| c.is_ascii_alphabetic())
        && region.chars().all(|c| c.is_ascii_alphabetic());
    valid.then(|| format!("{}-{}", lang, region))
}

fn parse_catalog(body: VoicesResponse, language_code: &str) -> Vec<Voice> {
    let lang_prefix = language_code
        .split('-')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    body.voices
        .into_iter()
        .filter(|v| {
            v.language_codes.is_empty()
                || v
                    .language_codes
                    .iter()
                    .any(|lc| lc.to_lowercase().starts_with(&lang_prefix))
        })
        .filter_map(|v| {
            let id = VoiceId::new(&v.name).ok()?;
            let gender = Gender::parse_lenient(v.ssml_gender.as_deref().unwrap_or_default());
            Some(Voice::new(id, v.name, gender, ProviderKind::Google))
        })
        .collect()
}

#[async_trait]
impl TtsProviderPort for GoogleTtsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let url = format!("{}/v1/voices", self.config.base_url);
        tracing::debug!(
            url = %url,
            language_code = %self.config.language_code,
            "Fetching Google voices"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("languageCode", self.config.language_code.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response, None).await?;

        let body: VoicesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let total = body.voices.len();
        let voices = parse_catalog(body, &self.config.language_code);

        tracing::info!(
            total = total,
            kept = voices.len(),
            language_code = %self.config.language_code,
            "Google voice catalog fetched"
        );
        Ok(voices)
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        let text = ensure_text(&request.text)?;
        let voice_name = request.voice_id.as_str();
        let language_code = language_from_voice(voice_name).unwrap_or_else(|| {
            tracing::warn!(
                voice_id = %voice_name,
                default = %self.config.language_code,
                "Cannot parse language code from voice name, using default"
            );
            self.config.language_code.clone()
        });

        let body = SynthesizeBody {
            input: TextInput { text },
            voice: VoiceSelection {
                language_code: &language_code,
                name: voice_name,
            },
            audio_config: AudioConfigDto {
                audio_encoding: &self.config.audio_encoding,
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.config.base_url))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, Some(voice_name)).await?;

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let audio_data = base64::engine::general_purpose::STANDARD
            .decode(body.audio_content.as_bytes())
            .map_err(|e| ProviderError::InvalidResponse(format!("Invalid audioContent: {}", e)))?;
        if audio_data.is_empty() {
            return Err(ProviderError::InvalidResponse("Empty audio".to_string()));
        }

        tracing::info!(
            voice_id = %voice_name,
            audio_size = audio_data.len(),
            "Google synthesis completed"
        );

        Ok(SynthesizedAudio {
            audio_data,
            format: self.format,
        })
    }
}
