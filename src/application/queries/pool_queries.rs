//! Voice Pool Queries

use crate::domain::voice::ProviderKind;

/// 加载提供方音色池查询
#[derive(Debug, Clone)]
pub struct LoadVoicePool {
    pub provider: ProviderKind,
}
