//! Voice Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Gender, ProviderKind, VoiceError, VoiceFilter, VoiceId};

/// 可合成的音色
///
/// 获取后不可变，会话期间只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    id: VoiceId,
    name: String,
    gender: Gender,
    provider: ProviderKind,
}

impl Voice {
    pub fn new(id: VoiceId, name: impl Into<String>, gender: Gender, provider: ProviderKind) -> Self {
        Self {
            id,
            name: name.into(),
            gender,
            provider,
        }
    }

    pub fn id(&self) -> &VoiceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }
}

/// Voice Pool 聚合根 - 经过过滤的提供方音色目录
///
/// 不变量:
/// - 池内所有音色属于同一个 provider
/// - 音色 ID 唯一，保持目录原始顺序（分配策略依赖该顺序做确定性选择）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePool {
    provider: ProviderKind,
    voices: Vec<Voice>,
    fetched_at: DateTime<Utc>,
}

impl VoicePool {
    /// 由提供方返回的原始目录构建音色池
    ///
    /// 应用过滤规则，丢弃重复 ID 和其他提供方的音色
    pub fn from_catalog(provider: ProviderKind, catalog: Vec<Voice>, filter: &VoiceFilter) -> Self {
        let mut seen = HashSet::new();
        let voices = catalog
            .into_iter()
            .filter(|v| v.provider == provider)
            .filter(|v| filter.matches(&v.name))
            .filter(|v| seen.insert(v.id.clone()))
            .collect();

        Self {
            provider,
            voices,
            fetched_at: Utc::now(),
        }
    }

    /// 校验从持久化存储读回的音色池
    pub fn validate(&self) -> Result<(), VoiceError> {
        let mut seen = HashSet::new();
        for voice in &self.voices {
            if voice.provider != self.provider {
                return Err(VoiceError::ProviderMismatch {
                    expected: self.provider.to_string(),
                    actual: voice.provider.to_string(),
                });
            }
            if !seen.insert(&voice.id) {
                return Err(VoiceError::InvalidVoiceId(format!(
                    "重复的音色 ID: {}",
                    voice.id
                )));
            }
        }
        Ok(())
    }

    /// 候选音色（目录顺序）
    ///
    /// `Unknown` 性别返回全部音色
    pub fn candidates(&self, gender: Gender) -> Vec<&Voice> {
        self.voices
            .iter()
            .filter(|v| gender == Gender::Unknown || v.gender == gender)
            .collect()
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn count_by_gender(&self, gender: Gender) -> usize {
        self.voices.iter().filter(|v| v.gender == gender).count()
    }
}
