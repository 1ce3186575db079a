//! TTS Adapter - 各提供方的 TTS 客户端实现
//!
//! 会话启动时按配置构造唯一的提供方实例，之后只通过 TtsProviderPort 使用

mod common;
mod elevenlabs;
mod fake_tts_client;
mod gemini;
mod google;
mod openai;

pub use elevenlabs::{ElevenLabsClient, ElevenLabsClientConfig};
pub use fake_tts_client::FakeTtsClient;
pub use gemini::{GeminiTtsClient, GeminiTtsClientConfig};
pub use google::{GoogleTtsClient, GoogleTtsClientConfig};
pub use openai::{OpenAiTtsClient, OpenAiTtsClientConfig};

use std::sync::Arc;

use crate::application::ports::{ProviderError, TtsProviderPort};
use crate::config::AppConfig;
use crate::domain::voice::ProviderKind;

/// 按配置构造当前会话的提供方
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn TtsProviderPort>, ProviderError> {
    let api_key = config
        .provider_api_key()
        .ok_or_else(|| {
            ProviderError::ServiceError(format!("API key for {} is not set", config.provider))
        })?
        .to_string();
    let timeout_secs = config.http.timeout_secs;

    let provider: Arc<dyn TtsProviderPort> = match config.provider {
        ProviderKind::ElevenLabs => Arc::new(ElevenLabsClient::new(ElevenLabsClientConfig {
            model_id: config.elevenlabs.model_id.clone(),
            output_format: config.elevenlabs.output_format.clone(),
            timeout_secs,
            ..ElevenLabsClientConfig::new(api_key)
        })?),
        ProviderKind::Google => Arc::new(GoogleTtsClient::new(GoogleTtsClientConfig {
            language_code: config.google.language_code.clone(),
            audio_encoding: config.google.audio_encoding.clone(),
            timeout_secs,
            ..GoogleTtsClientConfig::new(api_key)
        })?),
        ProviderKind::OpenAi => Arc::new(OpenAiTtsClient::new(OpenAiTtsClientConfig {
            model: config.openai.model.clone(),
            response_format: config.openai.response_format.clone(),
            timeout_secs,
            ..OpenAiTtsClientConfig::new(api_key)
        })?),
        ProviderKind::Gemini => Arc::new(GeminiTtsClient::new(GeminiTtsClientConfig {
            model: config.gemini.tts_model.clone(),
            timeout_secs,
            ..GeminiTtsClientConfig::new(api_key)
        })?),
    };

    tracing::info!(
        provider = %provider.kind(),
        persona = provider.supports_persona(),
        "TTS provider initialized"
    );
    Ok(provider)
}
