//! File Storage - 文件系统状态存储实现
//!
//! 实现 StateStoragePort trait，写入采用"临时文件 + rename"保证原子替换，
//! 跨进程锁使用 `<name>.lock` 文件上的 advisory 排他锁

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::application::ports::{StateLock, StateStoragePort, StorageError};

/// 文件系统状态存储
pub struct FileStateStorage {
    /// 存储根目录
    base_dir: PathBuf,
}

impl FileStateStorage {
    /// 创建新的文件存储
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // 确保目录存在
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StorageError::io(base_dir.display().to_string(), e))?;

        Ok(Self { base_dir })
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let invalid = name.is_empty()
            || name.starts_with('.')
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..");
        if invalid {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_dir.join(name))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.base_dir
            .join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }

    async fn write_temp(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// 阻塞直到获得锁文件的排他锁
    fn lock_file(path: &Path) -> std::io::Result<std::fs::File> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        FileExt::lock_exclusive(&file)?;
        Ok(file)
    }
}

#[async_trait]
impl StateStoragePort for FileStateStorage {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.object_path(name)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    async fn write_atomic(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(name)?;
        let temp = self.temp_path(name);

        if let Err(e) = Self::write_temp(&temp, data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::io(name, e));
        }

        // rename 在同一目录内原子替换目标文件
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::io(name, e));
        }

        tracing::debug!(
            path = %path.display(),
            size = data.len(),
            "State file written"
        );

        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.object_path(name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "State file removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    async fn lock(&self, name: &str) -> Result<StateLock, StorageError> {
        let path = self.object_path(&format!("{}.lock", name))?;

        // flock 会阻塞线程，放到阻塞线程池等待
        let lock_path = path.clone();
        let file = tokio::task::spawn_blocking(move || Self::lock_file(&lock_path))
            .await
            .map_err(|e| StorageError::io(name, e))?
            .map_err(|e| StorageError::io(name, e))?;

        tracing::trace!(path = %path.display(), "State lock acquired");
        Ok(StateLock::holding(file))
    }
}
