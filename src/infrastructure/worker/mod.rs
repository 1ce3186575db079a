//! Worker Layer - 交互模式
//!
//! CapturePipeline 执行单次运行，InteractiveListener 负责事件分发，
//! hotkey 模块提供全局按键事件源

mod capture_pipeline;
mod hotkey;
mod listener;

pub use capture_pipeline::CapturePipeline;
pub use hotkey::{parse_key, spawn_hotkey_source, HotkeyBindings};
pub use listener::{
    InteractiveListener, ListenerConfig, ListenerEvent, ListenerStats, EVENT_QUEUE_CAPACITY,
};
