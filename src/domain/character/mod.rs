//! Character Context - 角色音色账本限界上下文
//!
//! 职责:
//! - 角色键归一化
//! - 角色 → {音色, 人设} 的持久映射（每个提供方一本账）
//! - 新角色的音色分配策略（未分配优先、耗尽后复用、空池回退）

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::{select_voice, AllocationKind, Ledger, LedgerEntry};
pub use errors::LedgerError;
pub use value_objects::CharacterKey;
