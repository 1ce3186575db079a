//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Voice Context: 提供方音色目录
//! - Character Context: 角色音色账本与分配策略

pub mod character;
pub mod voice;
