//! Audio Output Port - 音频播放与保存抽象
//!
//! 输出设备是进程内唯一的共享资源，实现方需在播放期间独占并在所有退出路径上释放

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use super::SynthesizedAudio;

/// 播放/保存错误
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Output device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Audio Output Port
#[async_trait]
pub trait AudioOutputPort: Send + Sync {
    /// 播放音频，直到播放结束才返回
    async fn play(&self, audio: &SynthesizedAudio) -> Result<(), PlaybackError>;

    /// 将音频写入文件，自动创建父目录
    async fn save(&self, audio: &SynthesizedAudio, path: &Path) -> Result<(), PlaybackError>;
}
