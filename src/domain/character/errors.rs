//! Character Context - Errors

use thiserror::Error;

use super::CharacterKey;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("角色已分配音色: {0}")]
    AlreadyAssigned(CharacterKey),

    #[error("账本提供方不匹配: 期望 {expected}, 实际 {actual}")]
    ProviderMismatch { expected: String, actual: String },

    #[error("账本条目键不一致: {key} 记录为 {recorded}")]
    KeyMismatch { key: String, recorded: String },

    #[error("账本角色键未归一化: {0:?}")]
    UnnormalizedKey(String),
}
