//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsProvider、StateStorage、Repository、ImageAnalyzer 等）
//! - commands: 音色分配、缓存清除、截图朗读命令及处理器
//! - queries: 音色池查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    handlers::{
        AssignmentEngine, ClearCacheHandler, ClearCacheResponse, PipelineState, ProviderLocks,
        Resolution, ResolvedVoice, SpeakImageHandler, SpeakOutcome,
    },
    ClearProviderCache, OutputTarget, ResolveVoice, SpeakImage,
};

pub use error::ApplicationError;

pub use ports::{
    AnalyzerError, AudioFormat, AudioOutputPort, CaptureError, CharacterAnalysis,
    ImageAnalyzerPort, LedgerRepositoryPort, PlaybackError, ProviderError, RepositoryError,
    ScreenCapturePort, StateStoragePort, StorageError, SynthesisRequest, SynthesizedAudio,
    TtsProviderPort, VoicePoolRepositoryPort,
};

pub use queries::{handlers::VoicePoolStore, LoadVoicePool};
