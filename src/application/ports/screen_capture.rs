//! Screen Capture Port - 屏幕截图抽象

use async_trait::async_trait;
use thiserror::Error;

/// 截图错误
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture command failed: {0}")]
    CommandFailed(String),

    #[error("Capture produced no image")]
    EmptyImage,

    #[error("IO error: {0}")]
    IoError(String),
}

/// Screen Capture Port
#[async_trait]
pub trait ScreenCapturePort: Send + Sync {
    /// 截取当前屏幕，返回编码后的图像字节（PNG）
    async fn capture(&self) -> Result<Vec<u8>, CaptureError>;
}
