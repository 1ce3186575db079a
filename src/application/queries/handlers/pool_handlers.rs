//! Voice Pool Store - 音色池查询处理器
//!
//! 首次使用时通过提供方获取目录、应用过滤规则并持久化，
//! 之后（同一会话或重启后）直接返回持久化的音色池，直到显式清除

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::error::ApplicationError;
use crate::application::ports::{TtsProviderPort, VoicePoolRepositoryPort};
use crate::application::queries::LoadVoicePool;
use crate::domain::voice::{Gender, ProviderKind, VoiceFilter, VoicePool};

/// Voice Pool Store
pub struct VoicePoolStore {
    provider: Arc<dyn TtsProviderPort>,
    pool_repo: Arc<dyn VoicePoolRepositoryPort>,
    filter: VoiceFilter,
    /// 会话内缓存；锁同时保证并发首次加载只获取一次目录
    loaded: Mutex<Option<Arc<VoicePool>>>,
}

impl VoicePoolStore {
    pub fn new(
        provider: Arc<dyn TtsProviderPort>,
        pool_repo: Arc<dyn VoicePoolRepositoryPort>,
        filter: VoiceFilter,
    ) -> Self {
        Self {
            provider,
            pool_repo,
            filter,
            loaded: Mutex::new(None),
        }
    }

    pub async fn handle(&self, query: LoadVoicePool) -> Result<Arc<VoicePool>, ApplicationError> {
        self.load_pool(query.provider).await
    }

    /// 加载音色池
    ///
    /// 先查缓存再访问网络；获取失败且无缓存时返回配置错误
    pub async fn load_pool(&self, provider: ProviderKind) -> Result<Arc<VoicePool>, ApplicationError> {
        let active = self.provider.kind();
        if provider != active {
            return Err(ApplicationError::validation(format!(
                "Voice pool requested for {} but active provider is {}",
                provider, active
            )));
        }

        let mut loaded = self.loaded.lock().await;
        if let Some(pool) = loaded.as_ref() {
            return Ok(pool.clone());
        }

        if let Some(pool) = self.pool_repo.load(provider).await? {
            tracing::info!(
                provider = %provider,
                voices = pool.len(),
                male = pool.count_by_gender(Gender::Male),
                female = pool.count_by_gender(Gender::Female),
                fetched_at = %pool.fetched_at(),
                "Voice pool loaded from cache"
            );
            let pool = Arc::new(pool);
            *loaded = Some(pool.clone());
            return Ok(pool);
        }

        tracing::info!(provider = %provider, "No cached voice pool, fetching catalog");
        let catalog = self.provider.fetch_voices().await.map_err(|e| {
            tracing::error!(provider = %provider, error = %e, "Voice catalog fetch failed");
            ApplicationError::configuration(format!(
                "Cannot fetch voice catalog for {} and no cached pool exists: {}",
                provider, e
            ))
        })?;

        let fetched = catalog.len();
        let pool = VoicePool::from_catalog(provider, catalog, &self.filter);
        if pool.is_empty() {
            tracing::warn!(
                provider = %provider,
                fetched = fetched,
                "Voice pool is empty after filtering, fallback voice will be used"
            );
        }

        self.pool_repo.save(&pool).await?;
        tracing::info!(
            provider = %provider,
            fetched = fetched,
            kept = pool.len(),
            filtered = !self.filter.is_pass_through(),
            "Voice pool fetched and cached"
        );

        let pool = Arc::new(pool);
        *loaded = Some(pool.clone());
        Ok(pool)
    }

    /// 删除持久化的音色池并丢弃会话内缓存
    pub async fn clear(&self, provider: ProviderKind) -> Result<bool, ApplicationError> {
        let mut loaded = self.loaded.lock().await;
        let existed = self.pool_repo.clear(provider).await?;
        if provider == self.provider.kind() {
            *loaded = None;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::StateStoragePort;
    use crate::domain::voice::{Voice, VoiceId};
    use crate::infrastructure::adapters::{FakeTtsClient, InMemoryStateStorage};
    use crate::infrastructure::persistence::JsonVoicePoolRepository;

    fn catalog() -> Vec<Voice> {
        vec![
            Voice::new(VoiceId::new("m1").unwrap(), "Deep Male", Gender::Male, ProviderKind::OpenAi),
            Voice::new(VoiceId::new("f1").unwrap(), "Bright Female", Gender::Female, ProviderKind::OpenAi),
        ]
    }

    fn store(
        fake: Arc<FakeTtsClient>,
        storage: Arc<InMemoryStateStorage>,
        filter: VoiceFilter,
    ) -> VoicePoolStore {
        VoicePoolStore::new(fake, Arc::new(JsonVoicePoolRepository::new(storage)), filter)
    }

    #[tokio::test]
    async fn test_fetches_once_then_uses_cache() {
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog()));
        let storage = Arc::new(InMemoryStateStorage::new());

        let first = store(fake.clone(), storage.clone(), VoiceFilter::pass_through());
        let pool = first.load_pool(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(pool.len(), 2);
        first.load_pool(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(fake.fetch_count(), 1);

        // 新会话（模拟重启）读取持久化的音色池
        let second = store(fake.clone(), storage, VoiceFilter::pass_through());
        let pool = second.load_pool(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(fake.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_filter_applied_before_persisting() {
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog()));
        let storage = Arc::new(InMemoryStateStorage::new());
        let store = store(fake, storage, VoiceFilter::new(["female"]));

        let pool = store.load_pool(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.voices()[0].id().as_str(), "f1");
    }

    #[tokio::test]
    async fn test_fetch_failure_without_cache_is_configuration_error() {
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog()));
        fake.set_fail_fetch(true);
        let store = store(fake, Arc::new(InMemoryStateStorage::new()), VoiceFilter::pass_through());

        let err = store.load_pool(ProviderKind::OpenAi).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_cached_pool_skips_network_even_if_fetch_would_fail() {
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog()));
        let storage = Arc::new(InMemoryStateStorage::new());
        store(fake.clone(), storage.clone(), VoiceFilter::pass_through())
            .load_pool(ProviderKind::OpenAi)
            .await
            .unwrap();

        fake.set_fail_fetch(true);
        let pool = store(fake.clone(), storage, VoiceFilter::pass_through())
            .load_pool(ProviderKind::OpenAi)
            .await
            .unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(fake.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_triggers_fresh_fetch() {
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog()));
        let storage = Arc::new(InMemoryStateStorage::new());
        let store = store(fake.clone(), storage.clone(), VoiceFilter::pass_through());

        store.load_pool(ProviderKind::OpenAi).await.unwrap();
        assert!(store.clear(ProviderKind::OpenAi).await.unwrap());
        assert!(storage.read("voices_openai.json").await.unwrap().is_none());

        store.load_pool(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(fake.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_pool_file_is_surfaced() {
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog()));
        let storage = Arc::new(InMemoryStateStorage::new());
        storage
            .write_atomic("voices_openai.json", b"{not json")
            .await
            .unwrap();

        let err = store(fake.clone(), storage, VoiceFilter::pass_through())
            .load_pool(ProviderKind::OpenAi)
            .await
            .unwrap_err();
        assert!(err.is_state_corruption());
        assert_eq!(fake.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_foreign_provider() {
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog()));
        let store = store(fake, Arc::new(InMemoryStateStorage::new()), VoiceFilter::pass_through());
        assert!(store.load_pool(ProviderKind::Gemini).await.is_err());
    }
}
