//! In-Memory State Storage
//!
//! 进程内存储，供测试和一次性运行使用；不跨进程共享，锁为空操作

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::ports::{StateLock, StateStoragePort, StorageError};

/// 内存状态存储
pub struct InMemoryStateStorage {
    objects: DashMap<String, Vec<u8>>,
}

impl InMemoryStateStorage {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }
}

impl Default for InMemoryStateStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStoragePort for InMemoryStateStorage {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.get(name).map(|v| v.value().clone()))
    }

    async fn write_atomic(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        if name.is_empty() {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        self.objects.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.objects.remove(name).is_some())
    }

    async fn lock(&self, _name: &str) -> Result<StateLock, StorageError> {
        Ok(StateLock::local())
    }
}
