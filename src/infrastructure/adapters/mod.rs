//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod analyzer;
pub mod capture;
pub(crate) mod gemini_dto;
pub mod playback;
pub mod storage;
pub mod tts;

pub use analyzer::*;
pub use capture::*;
pub use playback::*;
pub use storage::*;
pub use tts::*;
