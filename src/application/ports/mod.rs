//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_output;
mod image_analyzer;
mod repositories;
mod screen_capture;
mod state_storage;
mod tts_provider;

pub use audio_output::{AudioOutputPort, PlaybackError};
pub use image_analyzer::{AnalyzerError, CharacterAnalysis, ImageAnalyzerPort};
pub use repositories::{LedgerRepositoryPort, RepositoryError, VoicePoolRepositoryPort};
pub use screen_capture::{CaptureError, ScreenCapturePort};
pub use state_storage::{StateLock, StateStoragePort, StorageError};
pub use tts_provider::{
    AudioFormat, ProviderError, SynthesisRequest, SynthesizedAudio, TtsProviderPort,
};
