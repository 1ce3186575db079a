//! Analyzer Adapter - 截图分析实现

mod gemini_analyzer;

pub use gemini_analyzer::{GeminiImageAnalyzer, GeminiImageAnalyzerConfig};
