//! Command Screen Capture
//!
//! 运行外部截图命令（默认 `grim -`），从标准输出读取编码后的图像

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::application::ports::{CaptureError, ScreenCapturePort};

/// 外部命令截图
pub struct CommandScreenCapture {
    program: String,
    args: Vec<String>,
}

impl CommandScreenCapture {
    /// 按空白切分命令行，第一个词为程序名
    pub fn new(command_line: &str) -> Result<Self, CaptureError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| CaptureError::CommandFailed("Capture command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl ScreenCapturePort for CommandScreenCapture {
    async fn capture(&self) -> Result<Vec<u8>, CaptureError> {
        tracing::debug!(program = %self.program, args = ?self.args, "Capturing screen");

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::IoError(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::CommandFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(CaptureError::EmptyImage);
        }

        tracing::debug!(size = output.stdout.len(), "Screen captured");
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let capture = CommandScreenCapture::new("  grim  -t png - ").unwrap();
        assert_eq!(capture.program(), "grim");
        assert_eq!(capture.args, vec!["-t", "png", "-"]);
        assert!(CommandScreenCapture::new("   ").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reads_stdout() {
        let capture = CommandScreenCapture::new("printf PNGDATA").unwrap();
        assert_eq!(capture.capture().await.unwrap(), b"PNGDATA");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_is_error() {
        let capture = CommandScreenCapture::new("true").unwrap();
        assert!(matches!(capture.capture().await, Err(CaptureError::EmptyImage)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command() {
        let capture = CommandScreenCapture::new("false").unwrap();
        assert!(matches!(
            capture.capture().await,
            Err(CaptureError::CommandFailed(_))
        ));

        let missing = CommandScreenCapture::new("scenevoice-no-such-binary").unwrap();
        assert!(matches!(missing.capture().await, Err(CaptureError::IoError(_))));
    }
}
