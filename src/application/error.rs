//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{
    AnalyzerError, CaptureError, PlaybackError, ProviderError, RepositoryError,
};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 配置错误（启动时致命）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 持久状态损坏（上报给操作者，不静默丢弃）
    #[error("State corruption: {0}")]
    StateCorruption(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 外部服务错误（分析/合成）
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 截图失败
    #[error("Capture error: {0}")]
    CaptureError(String),

    /// 播放/保存失败
    #[error("Playback error: {0}")]
    PlaybackError(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 是否为持久状态损坏
    pub fn is_state_corruption(&self) -> bool {
        matches!(self, Self::StateCorruption(_))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        if err.is_corrupt() {
            Self::StateCorruption(err.to_string())
        } else {
            Self::RepositoryError(err.to_string())
        }
    }
}

impl From<ProviderError> for ApplicationError {
    fn from(err: ProviderError) -> Self {
        Self::ExternalServiceError(format!("TTS: {}", err))
    }
}

impl From<AnalyzerError> for ApplicationError {
    fn from(err: AnalyzerError) -> Self {
        Self::ExternalServiceError(format!("Analyzer: {}", err))
    }
}

impl From<CaptureError> for ApplicationError {
    fn from(err: CaptureError) -> Self {
        Self::CaptureError(err.to_string())
    }
}

impl From<PlaybackError> for ApplicationError {
    fn from(err: PlaybackError) -> Self {
        Self::PlaybackError(err.to_string())
    }
}
