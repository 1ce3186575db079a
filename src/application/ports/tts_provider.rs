//! TTS Provider Port - 语音合成提供方抽象
//!
//! 四种提供方（ElevenLabs、Google Cloud、OpenAI、Gemini）统一为同一形状，
//! 分配引擎和采集流水线只依赖本接口，具体实现在 infrastructure/adapters/tts 层

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::voice::{ProviderKind, Voice, VoiceId};

/// TTS 错误
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Empty text")]
    EmptyText,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::NetworkError(format!("Cannot connect to TTS service: {}", e))
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }
}

/// 音频编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的台词
    pub text: String,
    /// 目标音色
    pub voice_id: VoiceId,
    /// 人设提示（语气/韵律引导），不支持的提供方忽略
    pub persona_instructions: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice_id: VoiceId) -> Self {
        Self {
            text: text.into(),
            voice_id,
            persona_instructions: None,
        }
    }

    /// 空白人设视为未提供
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        let persona = persona.into();
        self.persona_instructions = if persona.trim().is_empty() {
            None
        } else {
            Some(persona.trim().to_string())
        };
        self
    }
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// 编码后的音频字节
    pub audio_data: Vec<u8>,
    /// 编码格式
    pub format: AudioFormat,
}

/// TTS Provider Port
///
/// 每个会话只构造一个实例，运行期间不再按提供方分支
#[async_trait]
pub trait TtsProviderPort: Send + Sync {
    /// 提供方标识（决定账本与音色池的作用域）
    fn kind(&self) -> ProviderKind;

    /// 是否使用 `persona_instructions`
    fn supports_persona(&self) -> bool {
        false
    }

    /// 获取提供方的原始音色目录
    async fn fetch_voices(&self) -> Result<Vec<Voice>, ProviderError>;

    /// 合成台词音频
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, ProviderError>;
}
