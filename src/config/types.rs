//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::voice::ProviderKind;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 当前会话使用的 TTS 提供方
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    /// 音色池配置
    #[serde(default)]
    pub voices: VoicesConfig,

    /// 截图分析配置
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 交互模式配置
    #[serde(default)]
    pub interactive: InteractiveConfig,

    /// HTTP 客户端配置
    #[serde(default)]
    pub http: HttpConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

fn default_provider() -> ProviderKind {
    ProviderKind::ElevenLabs
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            elevenlabs: ElevenLabsConfig::default(),
            google: GoogleConfig::default(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            voices: VoicesConfig::default(),
            analyzer: AnalyzerConfig::default(),
            storage: StorageConfig::default(),
            interactive: InteractiveConfig::default(),
            http: HttpConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 当前提供方的 API 密钥
    pub fn provider_api_key(&self) -> Option<&str> {
        let key = match self.provider {
            ProviderKind::ElevenLabs => self.elevenlabs.api_key.as_deref(),
            ProviderKind::Google => self.google.api_key.as_deref(),
            ProviderKind::OpenAi => self.openai.api_key.as_deref(),
            ProviderKind::Gemini => self.gemini.api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    /// 截图分析使用的 API 密钥，未单独配置时沿用 Gemini 密钥
    pub fn analyzer_api_key(&self) -> Option<&str> {
        self.analyzer
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.gemini.api_key.as_deref().filter(|k| !k.trim().is_empty()))
    }

    /// 生效的回退音色
    pub fn fallback_voice_id(&self) -> String {
        self.voices
            .fallback_voice_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_fallback_voice(self.provider).to_string())
    }
}

/// 各提供方的默认回退音色
pub fn default_fallback_voice(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::ElevenLabs => "JBFqnCBsd6RMkjVDRZzb",
        ProviderKind::Google => "en-US-Standard-A",
        ProviderKind::OpenAi => "alloy",
        ProviderKind::Gemini => "Kore",
    }
}

/// ElevenLabs 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ElevenLabsConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,

    /// 例如 mp3_44100_128
    #[serde(default = "default_elevenlabs_format")]
    pub output_format: String,
}

fn default_elevenlabs_model() -> String {
    "eleven_turbo_v2".to_string()
}

fn default_elevenlabs_format() -> String {
    "mp3_44100_128".to_string()
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_id: default_elevenlabs_model(),
            output_format: default_elevenlabs_format(),
        }
    }
}

/// Google Cloud TTS 配置
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// 音色目录按该语言过滤；无法从音色名解析语言时也用作合成语言
    #[serde(default = "default_google_language")]
    pub language_code: String,

    /// MP3 / LINEAR16 / OGG_OPUS
    #[serde(default = "default_google_encoding")]
    pub audio_encoding: String,
}

fn default_google_language() -> String {
    "en-US".to_string()
}

fn default_google_encoding() -> String {
    "MP3".to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language_code: default_google_language(),
            audio_encoding: default_google_encoding(),
        }
    }
}

/// OpenAI TTS 配置
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// 支持 instructions 的模型才会使用人设提示
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// mp3 / wav / opus
    #[serde(default = "default_openai_format")]
    pub response_format: String,
}

fn default_openai_model() -> String {
    "gpt-4o-mini-tts".to_string()
}

fn default_openai_format() -> String {
    "mp3".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            response_format: default_openai_format(),
        }
    }
}

/// Gemini TTS 配置
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_tts_model")]
    pub tts_model: String,
}

fn default_gemini_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            tts_model: default_gemini_tts_model(),
        }
    }
}

/// 音色池配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoicesConfig {
    /// 音色名子串白名单（不区分大小写），为空时不过滤
    #[serde(default)]
    pub filter: Vec<String>,

    /// 未配置时使用提供方默认值
    #[serde(default)]
    pub fallback_voice_id: Option<String>,
}

/// 截图分析配置
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_analyzer_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// 游戏/场景提示，随截图一起发送
    #[serde(default)]
    pub game_hint: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// 上传前截图的最大高度（像素），超出时等比缩小
    #[serde(default = "default_max_image_height")]
    pub max_image_height: u32,
}

fn default_analyzer_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_image_height() -> u32 {
    720
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: default_analyzer_model(),
            api_key: None,
            game_hint: String::new(),
            timeout_secs: default_timeout(),
            max_image_height: default_max_image_height(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 音色池与账本文件所在目录
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// 交互模式配置
#[derive(Debug, Clone, Deserialize)]
pub struct InteractiveConfig {
    /// 触发截图的按键（rdev 键名）
    #[serde(default = "default_trigger_key")]
    pub trigger_key: String,

    /// 退出按键
    #[serde(default = "default_exit_key")]
    pub exit_key: String,

    /// 截图命令，需将 PNG 写到标准输出
    #[serde(default = "default_capture_command")]
    pub capture_command: String,

    /// 设置后每次运行的音频都保存到该目录
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
}

fn default_trigger_key() -> String {
    "BackQuote".to_string()
}

fn default_exit_key() -> String {
    "Escape".to_string()
}

fn default_capture_command() -> String {
    "grim -".to_string()
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            trigger_key: default_trigger_key(),
            exit_key: default_exit_key(),
            capture_command: default_capture_command(),
            save_dir: None,
        }
    }
}

/// HTTP 客户端配置
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// TTS 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    120
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
