//! Voice Assignment Commands

use crate::domain::voice::{Gender, ProviderKind};

/// 解析角色音色命令
///
/// 已见过的角色直接返回账本条目，新角色分配音色并持久化
#[derive(Debug, Clone)]
pub struct ResolveVoice {
    pub provider: ProviderKind,
    /// 分析得到的角色名（未归一化）
    pub character_name: String,
    pub gender: Gender,
    /// 仅在首次分配时记录
    pub persona_instructions: String,
}

/// 清除提供方缓存命令（账本 + 音色池）
#[derive(Debug, Clone)]
pub struct ClearProviderCache {
    pub provider: ProviderKind,
}
