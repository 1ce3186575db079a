//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 提供方音色目录（Voice Pool）
//! - 性别标签与名称过滤规则
//! - 封闭音色集合（OpenAI、Gemini）

mod aggregate;
mod catalog;
mod errors;
mod value_objects;

pub use aggregate::{Voice, VoicePool};
pub use catalog::{builtin_catalog, builtin_voices, is_known_voice};
pub use errors::VoiceError;
pub use value_objects::{Gender, ProviderKind, VoiceFilter, VoiceId};
