//! Character Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::{CharacterKey, LedgerError};
use crate::domain::voice::{Gender, ProviderKind, Voice, VoiceId, VoicePool};

/// 音色分配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationKind {
    /// 候选池中尚未被任何角色使用的音色
    Unassigned,
    /// 候选池已耗尽，复用已分配的音色
    Reused,
    /// 没有性别匹配的音色，改用另一性别（或全部音色）中的音色
    CrossGender,
    /// 音色池为空，使用配置的回退音色
    Fallback,
}

/// 账本条目
///
/// 首次见到角色时创建，之后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    character: CharacterKey,
    voice_id: VoiceId,
    persona_instructions: String,
    gender: Gender,
    allocation: AllocationKind,
    assigned_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        character: CharacterKey,
        voice_id: VoiceId,
        persona_instructions: impl Into<String>,
        gender: Gender,
        allocation: AllocationKind,
    ) -> Self {
        Self {
            character,
            voice_id,
            persona_instructions: persona_instructions.into(),
            gender,
            allocation,
            assigned_at: Utc::now(),
        }
    }

    pub fn character(&self) -> &CharacterKey {
        &self.character
    }

    pub fn voice_id(&self) -> &VoiceId {
        &self.voice_id
    }

    pub fn persona_instructions(&self) -> &str {
        &self.persona_instructions
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn allocation(&self) -> AllocationKind {
        self.allocation
    }

    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }
}

/// Ledger 聚合根 - 单个提供方的角色音色账本
///
/// 不变量:
/// - 每个角色键至多一个条目，条目一经写入不再修改
/// - 同一账本中的条目不共享音色 ID，除非该性别的未分配候选已耗尽
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    provider: ProviderKind,
    entries: BTreeMap<CharacterKey, LedgerEntry>,
}

impl Ledger {
    pub fn empty(provider: ProviderKind) -> Self {
        Self {
            provider,
            entries: BTreeMap::new(),
        }
    }

    /// 校验从持久化存储读回的账本
    pub fn validate(&self, expected: ProviderKind) -> Result<(), LedgerError> {
        if self.provider != expected {
            return Err(LedgerError::ProviderMismatch {
                expected: expected.to_string(),
                actual: self.provider.to_string(),
            });
        }
        for (key, entry) in &self.entries {
            // 键必须是归一化形式，否则查找不到
            if CharacterKey::from_name(key.as_str()).as_ref() != Some(key) {
                return Err(LedgerError::UnnormalizedKey(key.to_string()));
            }
            if key != entry.character() {
                return Err(LedgerError::KeyMismatch {
                    key: key.to_string(),
                    recorded: entry.character().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &CharacterKey) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    /// 写入新条目；已存在的角色不可覆盖
    pub fn insert(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if self.entries.contains_key(entry.character()) {
            return Err(LedgerError::AlreadyAssigned(entry.character().clone()));
        }
        self.entries.insert(entry.character().clone(), entry);
        Ok(())
    }

    /// 已被任一条目使用的音色
    pub fn assigned_voice_ids(&self) -> HashSet<&VoiceId> {
        self.entries.values().map(|e| e.voice_id()).collect()
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 为新角色选择音色
///
/// 1. 候选 = 性别匹配的音色（Unknown 为全部）
/// 2. 目录顺序中第一个未被账本使用的候选
/// 3. 全部已使用时，复用目录顺序中的第一个候选
///
/// 没有性别匹配的音色时，依次改用另一性别和全部音色，结果记为 `CrossGender`。
/// 音色池为空时返回 `None`，由调用方使用回退音色
pub fn select_voice<'a>(
    pool: &'a VoicePool,
    ledger: &Ledger,
    gender: Gender,
) -> Option<(&'a Voice, AllocationKind)> {
    let assigned = ledger.assigned_voice_ids();

    let matched = pool.candidates(gender);
    if !matched.is_empty() {
        return pick(&matched, &assigned).map(|(voice, reused)| {
            let kind = if reused {
                AllocationKind::Reused
            } else {
                AllocationKind::Unassigned
            };
            (voice, kind)
        });
    }

    let mut substitutes = gender
        .opposite()
        .map(|other| pool.candidates(other))
        .unwrap_or_default();
    if substitutes.is_empty() {
        substitutes = pool.voices().iter().collect();
    }

    pick(&substitutes, &assigned).map(|(voice, _)| (voice, AllocationKind::CrossGender))
}

/// 未使用的第一个候选，否则第一个候选；第二项表示是否复用
fn pick<'a>(candidates: &[&'a Voice], assigned: &HashSet<&VoiceId>) -> Option<(&'a Voice, bool)> {
    if let Some(voice) = candidates.iter().find(|v| !assigned.contains(v.id())) {
        return Some((*voice, false));
    }
    candidates.first().map(|voice| (*voice, true))
}
