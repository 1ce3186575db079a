//! State Storage Port - 持久状态存储后端抽象
//!
//! 账本和音色池文件都通过本接口读写，生产环境使用文件系统，测试使用内存实现

use async_trait::async_trait;
use thiserror::Error;

/// 存储后端错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {name}: {message}")]
    IoError { name: String, message: String },

    #[error("Invalid object name: {0}")]
    InvalidName(String),
}

impl StorageError {
    pub fn io(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::IoError {
            name: name.into(),
            message: err.to_string(),
        }
    }
}

/// 跨进程排他锁，drop 时释放
pub struct StateLock {
    held: Option<Box<dyn std::any::Any + Send + Sync>>,
}

impl StateLock {
    /// 不持有系统资源的锁，用于只在单进程内共享的后端
    pub fn local() -> Self {
        Self { held: None }
    }

    /// 持有给定资源直到 drop
    pub fn holding<T: Send + Sync + 'static>(resource: T) -> Self {
        Self {
            held: Some(Box::new(resource)),
        }
    }
}

impl std::fmt::Debug for StateLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateLock")
            .field("held", &self.held.is_some())
            .finish()
    }
}

/// State Storage Port
///
/// 按名称存取完整对象，不支持部分写
#[async_trait]
pub trait StateStoragePort: Send + Sync {
    /// 读取对象，不存在时返回 `None`
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// 原子写入完整对象
    ///
    /// 并发读取者只能观察到旧内容或新内容，不会看到截断的文件
    async fn write_atomic(&self, name: &str, data: &[u8]) -> Result<(), StorageError>;

    /// 删除对象，返回对象此前是否存在
    async fn remove(&self, name: &str) -> Result<bool, StorageError>;

    /// 获取与 `name` 关联的排他锁，等待直到可用
    ///
    /// 共享同一存储的其他进程在锁释放前无法获取同名锁
    async fn lock(&self, name: &str) -> Result<StateLock, StorageError>;
}
