//! Gemini TTS Client
//!
//! 通过 generateContent 的 AUDIO 模态合成语音，人设提示作为前缀写入提示词。
//! 返回的是 base64 编码的 16-bit 单声道 PCM（24 kHz），这里封装为 WAV

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;

use super::common::{build_http_client, check_status, ensure_text};
use crate::application::ports::{
    AudioFormat, ProviderError, SynthesisRequest, SynthesizedAudio, TtsProviderPort,
};
use crate::domain::voice::{builtin_catalog, is_known_voice, ProviderKind, Voice};
use crate::infrastructure::adapters::gemini_dto::{
    generate_content_url, Content, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, Part, PrebuiltVoiceConfig, SpeechConfig, VoiceConfig, API_KEY_HEADER,
    DEFAULT_BASE_URL,
};

/// Gemini TTS 输出采样率
const PCM_SAMPLE_RATE: u32 = 24_000;
const PCM_CHANNELS: u16 = 1;
const PCM_BITS_PER_SAMPLE: u16 = 16;

/// Gemini TTS 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiTtsClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl GeminiTtsClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gemini-2.5-flash-preview-tts".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Gemini TTS 客户端
pub struct GeminiTtsClient {
    client: Client,
    config: GeminiTtsClientConfig,
}

impl GeminiTtsClient {
    pub fn new(config: GeminiTtsClientConfig) -> Result<Self, ProviderError> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }
}

/// 人设提示以 "{persona}: {text}" 的形式引导语气
fn build_prompt(text: &str, persona: Option<&str>) -> String {
    match persona.map(str::trim).filter(|p| !p.is_empty()) {
        Some(persona) => format!("{}: {}", persona, text),
        None => text.to_string(),
    }
}

fn build_request(prompt: String, voice_name: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(prompt)],
        }],
        generation_config: Some(GenerationConfig {
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice_name.to_string(),
                    },
                },
            }),
            temperature: None,
        }),
    }
}

/// 16-bit PCM 封装为 WAV
pub(crate) fn pcm_to_wav(pcm: &[u8], sample_rate: u32, num_channels: u16) -> Vec<u8> {
    let bits_per_sample = PCM_BITS_PER_SAMPLE;
    let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = num_channels * (bits_per_sample / 8);

    // 丢弃末尾不完整的样本
    let data = &pcm[..pcm.len() - pcm.len() % block_align as usize];
    let data_size = data.len() as u32;

    let mut wav = Vec::with_capacity(44 + data.len());

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&num_channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(data);

    wav
}

/// 从 mime 类型中解析采样率，例如 "audio/L16;codec=pcm;rate=24000"
fn sample_rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.parse().ok())
}

#[async_trait]
impl TtsProviderPort for GeminiTtsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn supports_persona(&self) -> bool {
        true
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let voices = builtin_catalog(ProviderKind::Gemini);
        tracing::info!(voices = voices.len(), "Gemini voice catalog loaded");
        Ok(voices)
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        let text = ensure_text(&request.text)?;
        let voice = request.voice_id.as_str();
        if !is_known_voice(ProviderKind::Gemini, voice) {
            return Err(ProviderError::VoiceNotFound(voice.to_string()));
        }

        let prompt = build_prompt(text, request.persona_instructions.as_deref());
        tracing::debug!(
            voice_id = %voice,
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending Gemini TTS request"
        );

        let response = self
            .client
            .post(generate_content_url(&self.config.base_url, &self.config.model))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&build_request(prompt, voice))
            .send()
            .await?;
        let response = check_status(response, None).await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if let Some(reason) = body.block_reason() {
            return Err(ProviderError::ServiceError(format!(
                "Gemini TTS response blocked: {}",
                reason
            )));
        }

        let inline = body
            .inline_data()
            .ok_or_else(|| ProviderError::InvalidResponse("No audio in response".to_string()))?;
        let pcm = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| ProviderError::InvalidResponse(format!("Invalid audio data: {}", e)))?;
        if pcm.is_empty() {
            return Err(ProviderError::InvalidResponse("Empty audio".to_string()));
        }

        let sample_rate = sample_rate_from_mime(&inline.mime_type).unwrap_or(PCM_SAMPLE_RATE);
        let audio_data = pcm_to_wav(&pcm, sample_rate, PCM_CHANNELS);

        tracing::info!(
            voice_id = %voice,
            sample_rate = sample_rate,
            audio_size = audio_data.len(),
            "Gemini synthesis completed"
        );

        Ok(SynthesizedAudio {
            audio_data,
            format: AudioFormat::Wav,
        })
    }
}
