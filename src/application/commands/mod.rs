//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：音色分配、缓存清除与截图朗读

mod speak_commands;
mod voice_commands;

pub mod handlers;

pub use speak_commands::*;
pub use voice_commands::*;
