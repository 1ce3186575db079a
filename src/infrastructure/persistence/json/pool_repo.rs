//! JSON Voice Pool Repository

use async_trait::async_trait;
use std::sync::Arc;

use super::pool_file_name;
use crate::application::ports::{RepositoryError, StateStoragePort, VoicePoolRepositoryPort};
use crate::domain::voice::{ProviderKind, VoicePool};

/// JSON Voice Pool Repository
pub struct JsonVoicePoolRepository {
    storage: Arc<dyn StateStoragePort>,
}

impl JsonVoicePoolRepository {
    pub fn new(storage: Arc<dyn StateStoragePort>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl VoicePoolRepositoryPort for JsonVoicePoolRepository {
    async fn load(&self, provider: ProviderKind) -> Result<Option<VoicePool>, RepositoryError> {
        let name = pool_file_name(provider);

        let Some(data) = self.storage.read(&name).await? else {
            return Ok(None);
        };

        let pool: VoicePool =
            serde_json::from_slice(&data).map_err(|e| RepositoryError::corrupt(&name, e))?;
        if pool.provider() != provider {
            return Err(RepositoryError::corrupt(
                &name,
                format!("pool belongs to {}", pool.provider()),
            ));
        }
        pool.validate().map_err(|e| RepositoryError::corrupt(&name, e))?;

        Ok(Some(pool))
    }

    async fn save(&self, pool: &VoicePool) -> Result<(), RepositoryError> {
        let name = pool_file_name(pool.provider());
        let data = serde_json::to_vec_pretty(pool)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        self.storage.write_atomic(&name, &data).await?;

        tracing::debug!(
            provider = %pool.provider(),
            voices = pool.len(),
            "Voice pool saved"
        );
        Ok(())
    }

    async fn clear(&self, provider: ProviderKind) -> Result<bool, RepositoryError> {
        Ok(self.storage.remove(&pool_file_name(provider)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::{Gender, Voice, VoiceFilter, VoiceId};
    use crate::infrastructure::adapters::{FileStateStorage, InMemoryStateStorage};
    use tempfile::tempdir;

    fn pool(provider: ProviderKind) -> VoicePool {
        VoicePool::from_catalog(
            provider,
            vec![
                Voice::new(VoiceId::new("a").unwrap(), "Alpha", Gender::Male, provider),
                Voice::new(VoiceId::new("b").unwrap(), "Beta", Gender::Female, provider),
            ],
            &VoiceFilter::pass_through(),
        )
    }

    #[tokio::test]
    async fn test_missing_pool() {
        let repo = JsonVoicePoolRepository::new(Arc::new(InMemoryStateStorage::new()));
        assert!(repo.load(ProviderKind::Gemini).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_roundtrip_preserves_order() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(FileStateStorage::new(temp_dir.path()).await.unwrap());
        let repo = JsonVoicePoolRepository::new(storage);

        let original = pool(ProviderKind::Google);
        repo.save(&original).await.unwrap();
        assert!(temp_dir.path().join("voices_google.json").exists());

        let loaded = repo.load(ProviderKind::Google).await.unwrap().unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.voices()[0].id().as_str(), "a");
    }

    #[tokio::test]
    async fn test_pools_are_per_provider() {
        let repo = JsonVoicePoolRepository::new(Arc::new(InMemoryStateStorage::new()));
        repo.save(&pool(ProviderKind::OpenAi)).await.unwrap();

        assert!(repo.load(ProviderKind::Gemini).await.unwrap().is_none());
        assert!(repo.load(ProviderKind::OpenAi).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_truncated_file_is_corrupt() {
        let storage = Arc::new(InMemoryStateStorage::new());
        storage
            .write_atomic("voices_elevenlabs.json", b"{\"provider\":")
            .await
            .unwrap();

        let repo = JsonVoicePoolRepository::new(storage);
        assert!(repo
            .load(ProviderKind::ElevenLabs)
            .await
            .unwrap_err()
            .is_corrupt());
    }
}
