//! Assignment Engine - 角色音色分配
//!
//! 不变量：每个 (provider, character key) 在持久化账本中有且仅有一个分配，
//! 无论该角色被遇到多少次、是否并发遇到

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::commands::ResolveVoice;
use crate::application::error::ApplicationError;
use crate::application::ports::LedgerRepositoryPort;
use crate::application::queries::handlers::VoicePoolStore;
use crate::domain::character::{select_voice, AllocationKind, CharacterKey, LedgerEntry};
use crate::domain::voice::{Gender, ProviderKind, VoiceId};

// ============================================================================
// Provider Locks
// ============================================================================

/// 按提供方划分的进程内互斥区
///
/// 账本的 load → mutate → save 序列在同一提供方内串行执行；
/// 跨进程的串行由 `LedgerRepositoryPort::lock` 负责，两者按此顺序获取
#[derive(Default)]
pub struct ProviderLocks {
    locks: DashMap<ProviderKind, Arc<Mutex<()>>>,
}

impl ProviderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, provider: ProviderKind) -> OwnedMutexGuard<()> {
        // 先克隆 Arc 再 await，避免持有 DashMap 分片锁
        let lock = self.locks.entry(provider).or_default().clone();
        lock.lock_owned().await
    }
}

// ============================================================================
// ResolveVoice
// ============================================================================

/// 解析结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 账本中已有条目，原样返回
    Existing,
    /// 新分配并已持久化
    Allocated(AllocationKind),
    /// 匿名说话人，使用回退音色且不记录
    Anonymous,
}

/// 解析音色响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVoice {
    pub voice_id: VoiceId,
    pub persona_instructions: String,
    pub character: Option<CharacterKey>,
    pub resolution: Resolution,
}

/// Assignment Engine
pub struct AssignmentEngine {
    pool_store: Arc<VoicePoolStore>,
    ledger_repo: Arc<dyn LedgerRepositoryPort>,
    locks: Arc<ProviderLocks>,
    fallback_voice: VoiceId,
}

impl AssignmentEngine {
    pub fn new(
        pool_store: Arc<VoicePoolStore>,
        ledger_repo: Arc<dyn LedgerRepositoryPort>,
        locks: Arc<ProviderLocks>,
        fallback_voice: VoiceId,
    ) -> Self {
        Self {
            pool_store,
            ledger_repo,
            locks,
            fallback_voice,
        }
    }

    pub fn fallback_voice(&self) -> &VoiceId {
        &self.fallback_voice
    }

    pub async fn handle(&self, command: ResolveVoice) -> Result<ResolvedVoice, ApplicationError> {
        let provider = command.provider;

        let Some(key) = CharacterKey::from_name(&command.character_name) else {
            tracing::info!(
                provider = %provider,
                voice_id = %self.fallback_voice,
                "Anonymous speaker, using fallback voice"
            );
            return Ok(ResolvedVoice {
                voice_id: self.fallback_voice.clone(),
                persona_instructions: String::new(),
                character: None,
                resolution: Resolution::Anonymous,
            });
        };

        let _guard = self.locks.acquire(provider).await;
        let _ledger_lock = self.ledger_repo.lock(provider).await?;

        let mut ledger = self.ledger_repo.load(provider).await?;
        if let Some(entry) = ledger.get(&key) {
            tracing::debug!(
                provider = %provider,
                character = %key,
                voice_id = %entry.voice_id(),
                assigned_at = %entry.assigned_at(),
                "Found existing voice assignment"
            );
            return Ok(ResolvedVoice {
                voice_id: entry.voice_id().clone(),
                persona_instructions: entry.persona_instructions().to_string(),
                character: Some(key),
                resolution: Resolution::Existing,
            });
        }

        let pool = self.pool_store.load_pool(provider).await?;
        let (voice_id, allocation) = match select_voice(&pool, &ledger, command.gender) {
            Some((voice, kind)) => (voice.id().clone(), kind),
            None => (self.fallback_voice.clone(), AllocationKind::Fallback),
        };

        let persona = command.persona_instructions.trim().to_string();
        let entry = LedgerEntry::new(
            key.clone(),
            voice_id.clone(),
            persona.clone(),
            command.gender,
            allocation,
        );
        ledger
            .insert(entry)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;

        // 返回前落盘：分配结果在使用前已持久化
        self.ledger_repo.save(&ledger).await?;

        match allocation {
            AllocationKind::Unassigned => tracing::info!(
                provider = %provider,
                character = %key,
                gender = %command.gender,
                voice_id = %voice_id,
                "Assigned new voice"
            ),
            AllocationKind::Reused => tracing::warn!(
                provider = %provider,
                character = %key,
                gender = %command.gender,
                voice_id = %voice_id,
                "No unused voices left for gender, reusing voice"
            ),
            AllocationKind::CrossGender => tracing::warn!(
                provider = %provider,
                character = %key,
                gender = %command.gender,
                voice_id = %voice_id,
                "No voices match gender, assigned voice of another gender"
            ),
            AllocationKind::Fallback => tracing::warn!(
                provider = %provider,
                character = %key,
                gender = %command.gender,
                voice_id = %voice_id,
                "Voice pool is empty, assigned fallback voice"
            ),
        }

        Ok(ResolvedVoice {
            voice_id,
            persona_instructions: persona,
            character: Some(key),
            resolution: Resolution::Allocated(allocation),
        })
    }

    /// `resolveVoice(provider, characterKey, genderTag, personaText)`
    pub async fn resolve_voice(
        &self,
        provider: ProviderKind,
        character_name: &str,
        gender: Gender,
        persona_instructions: &str,
    ) -> Result<ResolvedVoice, ApplicationError> {
        self.handle(ResolveVoice {
            provider,
            character_name: character_name.to_string(),
            gender,
            persona_instructions: persona_instructions.to_string(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::StateStoragePort;
    use crate::domain::voice::{Voice, VoiceFilter};
    use crate::infrastructure::adapters::{FakeTtsClient, FileStateStorage, InMemoryStateStorage};
    use crate::infrastructure::persistence::{JsonLedgerRepository, JsonVoicePoolRepository};
    use std::path::Path;
    use tempfile::tempdir;

    /// 独立进程视角的引擎：自己的存储实例、自己的 ProviderLocks，只共享数据目录
    async fn process_engine(dir: &Path, voices: &[(&str, Gender)]) -> Arc<AssignmentEngine> {
        let storage = Arc::new(FileStateStorage::new(dir).await.unwrap());
        let catalog = voices
            .iter()
            .map(|(id, g)| Voice::new(VoiceId::new(*id).unwrap(), *id, *g, ProviderKind::OpenAi))
            .collect();
        let pool_store = Arc::new(VoicePoolStore::new(
            Arc::new(FakeTtsClient::new(ProviderKind::OpenAi, catalog)),
            Arc::new(JsonVoicePoolRepository::new(storage.clone())),
            VoiceFilter::pass_through(),
        ));
        Arc::new(AssignmentEngine::new(
            pool_store,
            Arc::new(JsonLedgerRepository::new(storage)),
            Arc::new(ProviderLocks::new()),
            VoiceId::new("fallback").unwrap(),
        ))
    }

    struct Harness {
        storage: Arc<InMemoryStateStorage>,
        locks: Arc<ProviderLocks>,
        ledger_repo: Arc<JsonLedgerRepository>,
    }

    impl Harness {
        fn new() -> Self {
            let storage = Arc::new(InMemoryStateStorage::new());
            Self {
                ledger_repo: Arc::new(JsonLedgerRepository::new(storage.clone())),
                storage,
                locks: Arc::new(ProviderLocks::new()),
            }
        }

        /// 每次调用相当于一个新进程：新的音色池缓存、新的引擎，共享持久化存储
        fn engine(&self, provider: ProviderKind, voices: &[(&str, Gender)]) -> AssignmentEngine {
            let catalog = voices
                .iter()
                .map(|(id, g)| Voice::new(VoiceId::new(*id).unwrap(), *id, *g, provider))
                .collect();
            let fake = Arc::new(FakeTtsClient::new(provider, catalog));
            let pool_store = Arc::new(VoicePoolStore::new(
                fake,
                Arc::new(JsonVoicePoolRepository::new(self.storage.clone())),
                VoiceFilter::pass_through(),
            ));
            AssignmentEngine::new(
                pool_store,
                self.ledger_repo.clone(),
                self.locks.clone(),
                VoiceId::new("fallback").unwrap(),
            )
        }
    }

    const MALE_PAIR: &[(&str, Gender)] = &[("A", Gender::Male), ("B", Gender::Male)];

    #[tokio::test]
    async fn test_existing_character_never_drifts() {
        let h = Harness::new();
        let engine = h.engine(ProviderKind::OpenAi, MALE_PAIR);

        let first = engine
            .resolve_voice(ProviderKind::OpenAi, "Alice_Guard", Gender::Male, "stern")
            .await
            .unwrap();
        assert_eq!(first.resolution, Resolution::Allocated(AllocationKind::Unassigned));

        let again = engine
            .resolve_voice(ProviderKind::OpenAi, "  alice_guard ", Gender::Female, "cheerful")
            .await
            .unwrap();
        assert_eq!(again.resolution, Resolution::Existing);
        assert_eq!(again.voice_id, first.voice_id);
        assert_eq!(again.persona_instructions, "stern");
    }

    #[tokio::test]
    async fn test_unassigned_first_gives_distinct_voices() {
        let h = Harness::new();
        let engine = h.engine(ProviderKind::OpenAi, MALE_PAIR);

        let alice = engine
            .resolve_voice(ProviderKind::OpenAi, "alice_guard", Gender::Male, "")
            .await
            .unwrap();
        let bob = engine
            .resolve_voice(ProviderKind::OpenAi, "bob_guard", Gender::Male, "")
            .await
            .unwrap();

        assert_ne!(alice.voice_id, bob.voice_id);
        for v in [&alice.voice_id, &bob.voice_id] {
            assert!(v.as_str() == "A" || v.as_str() == "B");
        }
    }

    #[tokio::test]
    async fn test_pool_exhaustion_reuses_single_voice() {
        let h = Harness::new();
        let engine = h.engine(ProviderKind::OpenAi, &[("A", Gender::Male)]);

        for name in ["one", "two", "three"] {
            let resolved = engine
                .resolve_voice(ProviderKind::OpenAi, name, Gender::Male, "")
                .await
                .unwrap();
            assert_eq!(resolved.voice_id.as_str(), "A");
        }

        let ledger = h.ledger_repo.load(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(ledger.len(), 3);
        assert!(ledger.entries().all(|e| e.voice_id().as_str() == "A"));
        let reused = ledger
            .entries()
            .filter(|e| e.allocation() == AllocationKind::Reused)
            .count();
        assert_eq!(reused, 2);
    }

    #[tokio::test]
    async fn test_missing_gender_assigns_pool_voice_not_fallback() {
        let h = Harness::new();
        let engine = h.engine(ProviderKind::OpenAi, &[("F", Gender::Female)]);

        let resolved = engine
            .resolve_voice(ProviderKind::OpenAi, "grunt", Gender::Male, "")
            .await
            .unwrap();
        assert_eq!(resolved.voice_id.as_str(), "F");
        assert_eq!(
            resolved.resolution,
            Resolution::Allocated(AllocationKind::CrossGender)
        );

        let ledger = h.ledger_repo.load(ProviderKind::OpenAi).await.unwrap();
        let entry = ledger.get(&CharacterKey::from_name("grunt").unwrap()).unwrap();
        assert_eq!(entry.allocation(), AllocationKind::CrossGender);
    }

    #[tokio::test]
    async fn test_empty_pool_uses_fallback_and_records_it() {
        let h = Harness::new();
        let engine = h.engine(ProviderKind::OpenAi, &[]);

        let resolved = engine
            .resolve_voice(ProviderKind::OpenAi, "grunt", Gender::Male, "")
            .await
            .unwrap();
        assert_eq!(resolved.voice_id.as_str(), "fallback");
        assert_eq!(resolved.resolution, Resolution::Allocated(AllocationKind::Fallback));

        let ledger = h.ledger_repo.load(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_speaker_is_not_recorded() {
        let h = Harness::new();
        let engine = h.engine(ProviderKind::OpenAi, MALE_PAIR);

        let resolved = engine
            .resolve_voice(ProviderKind::OpenAi, "Unknown", Gender::Male, "narrator")
            .await
            .unwrap();
        assert_eq!(resolved.resolution, Resolution::Anonymous);
        assert_eq!(resolved.voice_id.as_str(), "fallback");
        assert!(resolved.persona_instructions.is_empty());
        assert!(h.ledger_repo.load(ProviderKind::OpenAi).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_providers_have_independent_ledgers() {
        let h = Harness::new();
        let openai = h.engine(ProviderKind::OpenAi, MALE_PAIR);

        openai
            .resolve_voice(ProviderKind::OpenAi, "alice", Gender::Male, "")
            .await
            .unwrap();

        let gemini_ledger = h.ledger_repo.load(ProviderKind::Gemini).await.unwrap();
        assert!(gemini_ledger.is_empty());

        let gemini = h.engine(ProviderKind::Gemini, &[("Puck", Gender::Male)]);
        gemini
            .resolve_voice(ProviderKind::Gemini, "alice", Gender::Male, "")
            .await
            .unwrap();

        let openai_ledger = h.ledger_repo.load(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(openai_ledger.len(), 1);
        let key = CharacterKey::from_name("alice").unwrap();
        assert_eq!(openai_ledger.get(&key).unwrap().voice_id().as_str(), "A");
    }

    #[tokio::test]
    async fn test_assignments_survive_restart() {
        let h = Harness::new();
        let before = h.engine(ProviderKind::OpenAi, MALE_PAIR);
        let mut assigned = Vec::new();
        for name in ["alice", "bob", "carol"] {
            assigned.push(
                before
                    .resolve_voice(ProviderKind::OpenAi, name, Gender::Male, name)
                    .await
                    .unwrap(),
            );
        }
        drop(before);

        let after = h.engine(ProviderKind::OpenAi, MALE_PAIR);
        for (name, expected) in ["alice", "bob", "carol"].iter().zip(&assigned) {
            let resolved = after
                .resolve_voice(ProviderKind::OpenAi, name, Gender::Unknown, "other")
                .await
                .unwrap();
            assert_eq!(resolved.resolution, Resolution::Existing);
            assert_eq!(resolved.voice_id, expected.voice_id);
            assert_eq!(resolved.persona_instructions, expected.persona_instructions);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_sighting_yields_single_entry() {
        let h = Harness::new();
        let engine = Arc::new(h.engine(
            ProviderKind::OpenAi,
            &[("A", Gender::Male), ("B", Gender::Male), ("C", Gender::Male)],
        ));

        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .resolve_voice(ProviderKind::OpenAi, "Double Fire", Gender::Male, &format!("p{}", i))
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        let first = &results[0];
        assert!(results
            .iter()
            .all(|r| r.voice_id == first.voice_id && r.persona_instructions == first.persona_instructions));
        let allocated = results
            .iter()
            .filter(|r| matches!(r.resolution, Resolution::Allocated(_)))
            .count();
        assert_eq!(allocated, 1);

        let ledger = h.ledger_repo.load(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_processes_agree_on_same_character() {
        let voices = &[("A", Gender::Male), ("B", Gender::Female)];
        for _ in 0..10 {
            let dir = tempdir().unwrap();
            let first = process_engine(dir.path(), voices).await;
            let second = process_engine(dir.path(), voices).await;

            let a = tokio::spawn(async move {
                first
                    .resolve_voice(ProviderKind::OpenAi, "guard", Gender::Male, "stern")
                    .await
            });
            let b = tokio::spawn(async move {
                second
                    .resolve_voice(ProviderKind::OpenAi, "guard", Gender::Female, "cheerful")
                    .await
            });
            let a = a.await.unwrap().unwrap();
            let b = b.await.unwrap().unwrap();

            assert_eq!(a.voice_id, b.voice_id);
            assert_eq!(a.persona_instructions, b.persona_instructions);

            let storage = Arc::new(FileStateStorage::new(dir.path()).await.unwrap());
            let ledger = JsonLedgerRepository::new(storage)
                .load(ProviderKind::OpenAi)
                .await
                .unwrap();
            assert_eq!(ledger.len(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_processes_keep_each_others_entries() {
        let voices = &[("A", Gender::Male), ("B", Gender::Male)];
        for _ in 0..10 {
            let dir = tempdir().unwrap();
            let first = process_engine(dir.path(), voices).await;
            let second = process_engine(dir.path(), voices).await;

            let alice = tokio::spawn(async move {
                first
                    .resolve_voice(ProviderKind::OpenAi, "alice", Gender::Male, "")
                    .await
            });
            let bob = tokio::spawn(async move {
                second
                    .resolve_voice(ProviderKind::OpenAi, "bob", Gender::Male, "")
                    .await
            });
            let alice = alice.await.unwrap().unwrap();
            let bob = bob.await.unwrap().unwrap();
            assert_ne!(alice.voice_id, bob.voice_id);

            let storage = Arc::new(FileStateStorage::new(dir.path()).await.unwrap());
            let ledger = JsonLedgerRepository::new(storage)
                .load(ProviderKind::OpenAi)
                .await
                .unwrap();
            assert_eq!(ledger.len(), 2);
            for (name, resolved) in [("alice", &alice), ("bob", &bob)] {
                let entry = ledger.get(&CharacterKey::from_name(name).unwrap()).unwrap();
                assert_eq!(entry.voice_id(), &resolved.voice_id);
            }
        }
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_reported_not_reset() {
        let h = Harness::new();
        h.storage
            .write_atomic("character_voices_openai.json", b"{\"provider\": \"openai\", \"entr")
            .await
            .unwrap();
        let engine = h.engine(ProviderKind::OpenAi, MALE_PAIR);

        let err = engine
            .resolve_voice(ProviderKind::OpenAi, "alice", Gender::Male, "")
            .await
            .unwrap_err();
        assert!(err.is_state_corruption());

        // 损坏的文件保持原样
        let raw = h.storage.read("character_voices_openai.json").await.unwrap().unwrap();
        assert_eq!(raw, b"{\"provider\": \"openai\", \"entr");
    }
}
