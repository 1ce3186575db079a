//! Voice Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("无效的音色 ID: {0}")]
    InvalidVoiceId(String),

    #[error("不支持的 TTS 提供方: {0}")]
    InvalidProvider(String),

    #[error("音色不属于当前提供方: 期望 {expected}, 实际 {actual}")]
    ProviderMismatch { expected: String, actual: String },
}
