//! SceneVoice - 游戏截图角色配音
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Voice Context: 音色、音色池、提供方
//! - Character Context: 角色键、音色账本与分配策略
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsProvider, StateStorage, Repositories, ImageAnalyzer, ScreenCapture, AudioOutput）
//! - Commands: 音色分配、缓存清除、截图朗读
//! - Queries: 音色池加载
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: 四个 TTS 客户端、Gemini 截图分析、截图命令、rodio 播放、状态存储
//! - Persistence: JSON 账本与音色池
//! - Worker: 交互模式流水线与事件循环

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
