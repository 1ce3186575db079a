//! Cache Command Handlers

use std::sync::Arc;

use crate::application::commands::handlers::ProviderLocks;
use crate::application::commands::ClearProviderCache;
use crate::application::error::ApplicationError;
use crate::application::ports::LedgerRepositoryPort;
use crate::application::queries::handlers::VoicePoolStore;

/// 清除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearCacheResponse {
    pub ledger_removed: bool,
    pub pool_removed: bool,
}

/// ClearProviderCache Handler
///
/// 在提供方互斥区内删除账本和音色池，之后的加载行为与首次运行一致
pub struct ClearCacheHandler {
    ledger_repo: Arc<dyn LedgerRepositoryPort>,
    pool_store: Arc<VoicePoolStore>,
    locks: Arc<ProviderLocks>,
}

impl ClearCacheHandler {
    pub fn new(
        ledger_repo: Arc<dyn LedgerRepositoryPort>,
        pool_store: Arc<VoicePoolStore>,
        locks: Arc<ProviderLocks>,
    ) -> Self {
        Self {
            ledger_repo,
            pool_store,
            locks,
        }
    }

    pub async fn handle(
        &self,
        command: ClearProviderCache,
    ) -> Result<ClearCacheResponse, ApplicationError> {
        let provider = command.provider;
        let _guard = self.locks.acquire(provider).await;
        let _ledger_lock = self.ledger_repo.lock(provider).await?;

        let ledger_removed = self.ledger_repo.clear(provider).await?;
        let pool_removed = self.pool_store.clear(provider).await?;

        tracing::info!(
            provider = %provider,
            ledger_removed = ledger_removed,
            pool_removed = pool_removed,
            "Provider cache cleared"
        );

        Ok(ClearCacheResponse {
            ledger_removed,
            pool_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::AssignmentEngine;
    use crate::domain::voice::{Gender, ProviderKind, Voice, VoiceFilter, VoiceId};
    use crate::infrastructure::adapters::{FakeTtsClient, InMemoryStateStorage};
    use crate::infrastructure::persistence::{JsonLedgerRepository, JsonVoicePoolRepository};

    #[tokio::test]
    async fn test_clear_resets_to_first_run() {
        let storage = Arc::new(InMemoryStateStorage::new());
        let fake = Arc::new(FakeTtsClient::new(
            ProviderKind::ElevenLabs,
            vec![Voice::new(
                VoiceId::new("v1").unwrap(),
                "Adam",
                Gender::Male,
                ProviderKind::ElevenLabs,
            )],
        ));
        let ledger_repo = Arc::new(JsonLedgerRepository::new(storage.clone()));
        let pool_store = Arc::new(VoicePoolStore::new(
            fake.clone(),
            Arc::new(JsonVoicePoolRepository::new(storage.clone())),
            VoiceFilter::pass_through(),
        ));
        let locks = Arc::new(ProviderLocks::new());
        let engine = AssignmentEngine::new(
            pool_store.clone(),
            ledger_repo.clone(),
            locks.clone(),
            VoiceId::new("fallback").unwrap(),
        );
        let handler = ClearCacheHandler::new(ledger_repo.clone(), pool_store.clone(), locks);

        engine
            .resolve_voice(ProviderKind::ElevenLabs, "alice", Gender::Male, "")
            .await
            .unwrap();
        assert_eq!(fake.fetch_count(), 1);

        let response = handler
            .handle(ClearProviderCache {
                provider: ProviderKind::ElevenLabs,
            })
            .await
            .unwrap();
        assert!(response.ledger_removed);
        assert!(response.pool_removed);

        assert!(ledger_repo
            .load(ProviderKind::ElevenLabs)
            .await
            .unwrap()
            .is_empty());
        pool_store.load_pool(ProviderKind::ElevenLabs).await.unwrap();
        assert_eq!(fake.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_on_first_run_is_noop() {
        let storage = Arc::new(InMemoryStateStorage::new());
        let fake = Arc::new(FakeTtsClient::new(ProviderKind::Google, Vec::new()));
        let ledger_repo = Arc::new(JsonLedgerRepository::new(storage.clone()));
        let pool_store = Arc::new(VoicePoolStore::new(
            fake,
            Arc::new(JsonVoicePoolRepository::new(storage)),
            VoiceFilter::pass_through(),
        ));
        let handler = ClearCacheHandler::new(ledger_repo, pool_store, Arc::new(ProviderLocks::new()));

        let response = handler
            .handle(ClearProviderCache {
                provider: ProviderKind::Google,
            })
            .await
            .unwrap();
        assert!(!response.ledger_removed);
        assert!(!response.pool_removed);
    }
}
