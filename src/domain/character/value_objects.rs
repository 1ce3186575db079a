//! Character Context - Value Objects

use serde::{Deserialize, Serialize};

/// 无法识别说话人时分析器返回的名称
const UNKNOWN_SPEAKER: &str = "unknown";

/// 角色键 - 大小写归一化后的角色名
///
/// 不变量:
/// - 非空，已去除首尾空白，内部连续空白折叠为单个空格，全部小写
/// - 不等于 "unknown"（匿名说话人不进入账本）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterKey(String);

impl CharacterKey {
    /// 从分析得到的角色名构建
    ///
    /// 空名称或匿名说话人返回 `None`
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if normalized.is_empty() || normalized == UNKNOWN_SPEAKER {
            return None;
        }
        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        let a = CharacterKey::from_name("  Alice   the Guard ").unwrap();
        let b = CharacterKey::from_name("alice THE guard").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "alice the guard");
    }

    #[test]
    fn test_anonymous_speaker_has_no_key() {
        assert!(CharacterKey::from_name("").is_none());
        assert!(CharacterKey::from_name("   ").is_none());
        assert!(CharacterKey::from_name("Unknown").is_none());
    }
}
