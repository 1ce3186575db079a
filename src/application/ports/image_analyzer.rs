//! Image Analyzer Port - 截图分析抽象
//!
//! 从截图中提取说话角色的名称、性别、台词和人设描述

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::voice::Gender;

/// 分析错误
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnalyzerError::Timeout
        } else {
            AnalyzerError::Unavailable(e.to_string())
        }
    }
}

/// 截图分析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterAnalysis {
    /// 角色名（无法识别时为 "Unknown"）
    pub character_name: String,
    pub gender: Gender,
    /// 台词（可能为空）
    pub dialogue: String,
    /// 人设描述（可能为空）
    pub persona_instructions: String,
}

impl CharacterAnalysis {
    pub fn has_dialogue(&self) -> bool {
        !self.dialogue.trim().is_empty()
    }
}

/// Image Analyzer Port
#[async_trait]
pub trait ImageAnalyzerPort: Send + Sync {
    /// 分析截图
    ///
    /// `context_hint` 为游戏/场景提示，可为空
    async fn analyze(
        &self,
        image: &[u8],
        context_hint: &str,
    ) -> Result<CharacterAnalysis, AnalyzerError>;
}
