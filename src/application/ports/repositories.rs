//! Repository Ports - 出站端口
//!
//! 定义账本和音色池的持久化抽象接口
//! 具体实现在 infrastructure/persistence 层（JSON over StateStoragePort）

use async_trait::async_trait;
use thiserror::Error;

use super::{StateLock, StorageError};
use crate::domain::character::Ledger;
use crate::domain::voice::{ProviderKind, VoicePool};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 持久化内容无法解析：必须上报，不能静默重置
    #[error("Corrupt state in {name}: {message}")]
    Corrupt { name: String, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RepositoryError {
    pub fn corrupt(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

// ============================================================================
// Ledger Repository
// ============================================================================

/// Ledger Repository Port
#[async_trait]
pub trait LedgerRepositoryPort: Send + Sync {
    /// 读取账本；文件不存在时返回空账本
    async fn load(&self, provider: ProviderKind) -> Result<Ledger, RepositoryError>;

    /// 原子写入完整账本
    async fn save(&self, ledger: &Ledger) -> Result<(), RepositoryError>;

    /// 删除账本，返回此前是否存在
    async fn clear(&self, provider: ProviderKind) -> Result<bool, RepositoryError>;

    /// 获取账本的跨进程锁；load → save 序列必须在持有期间完成
    async fn lock(&self, provider: ProviderKind) -> Result<StateLock, RepositoryError>;
}

// ============================================================================
// Voice Pool Repository
// ============================================================================

/// Voice Pool Repository Port
#[async_trait]
pub trait VoicePoolRepositoryPort: Send + Sync {
    /// 读取缓存的音色池；不存在时返回 `None`
    async fn load(&self, provider: ProviderKind) -> Result<Option<VoicePool>, RepositoryError>;

    /// 写入（覆盖）音色池
    async fn save(&self, pool: &VoicePool) -> Result<(), RepositoryError>;

    /// 删除音色池，返回此前是否存在
    async fn clear(&self, provider: ProviderKind) -> Result<bool, RepositoryError>;
}
