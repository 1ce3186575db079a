//! JSON Repositories
//!
//! 账本与音色池以 JSON 文档形式保存在 StateStoragePort 之上，
//! 每个提供方各自一份文件

mod ledger_repo;
mod pool_repo;

pub use ledger_repo::JsonLedgerRepository;
pub use pool_repo::JsonVoicePoolRepository;

use crate::domain::voice::ProviderKind;

/// 账本文件名
pub fn ledger_file_name(provider: ProviderKind) -> String {
    format!("character_voices_{}.json", provider.as_str())
}

/// 音色池文件名
pub fn pool_file_name(provider: ProviderKind) -> String {
    format!("voices_{}.json", provider.as_str())
}
