//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（scenevoice.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::voice::{is_known_voice, ProviderKind};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["scenevoice", "scenevoice.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `SCENEVOICE_`，层级分隔符 `__`）
/// 2. 配置文件（scenevoice.toml 或 scenevoice.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `SCENEVOICE_PROVIDER=openai`
/// - `SCENEVOICE_OPENAI__API_KEY=sk-...`
/// - `SCENEVOICE_STORAGE__DATA_DIR=/var/lib/scenevoice`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("provider", "elevenlabs")?
        .set_default("elevenlabs.model_id", "eleven_turbo_v2")?
        .set_default("elevenlabs.output_format", "mp3_44100_128")?
        .set_default("google.language_code", "en-US")?
        .set_default("google.audio_encoding", "MP3")?
        .set_default("openai.model", "gpt-4o-mini-tts")?
        .set_default("openai.response_format", "mp3")?
        .set_default("gemini.tts_model", "gemini-2.5-flash-preview-tts")?
        .set_default("analyzer.model", "gemini-2.0-flash")?
        .set_default("analyzer.timeout_secs", 120)?
        .set_default("analyzer.max_image_height", 720)?
        .set_default("storage.data_dir", "data")?
        .set_default("interactive.trigger_key", "BackQuote")?
        .set_default("interactive.exit_key", "Escape")?
        .set_default("interactive.capture_command", "grim -")?
        .set_default("http.timeout_secs", 120)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: SCENEVOICE_GEMINI__API_KEY=...
    // voices.filter 支持逗号分隔: SCENEVOICE_VOICES__FILTER=studio,neural
    builder = builder.add_source(
        Environment::with_prefix("SCENEVOICE")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("voices.filter")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
///
/// 配置错误在启动时即为致命错误
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let provider = config.provider;

    if config.provider_api_key().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "API key for provider {} is not set ({}.api_key)",
            provider, provider
        )));
    }

    if config.analyzer_api_key().is_none() {
        return Err(ConfigError::ValidationError(
            "Analyzer API key is not set (analyzer.api_key or gemini.api_key)".to_string(),
        ));
    }

    if config.storage.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Data directory cannot be empty".to_string(),
        ));
    }

    let fallback = config.fallback_voice_id();
    if !is_known_voice(provider, &fallback) {
        return Err(ConfigError::ValidationError(format!(
            "Fallback voice '{}' is not a {} voice",
            fallback, provider
        )));
    }

    if config.http.timeout_secs == 0 || config.analyzer.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Timeouts cannot be 0".to_string(),
        ));
    }

    if provider == ProviderKind::ElevenLabs && config.elevenlabs.model_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "ElevenLabs model id cannot be empty".to_string(),
        ));
    }

    if config.analyzer.max_image_height == 0 {
        return Err(ConfigError::ValidationError(
            "Analyzer max image height cannot be 0".to_string(),
        ));
    }

    if config.interactive.capture_command.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Capture command cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志），密钥只显示是否已设置
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Provider: {}", config.provider);
    tracing::info!("Provider API Key: {}", set_or_missing(config.provider_api_key()));
    match config.provider {
        ProviderKind::ElevenLabs => tracing::info!(
            "ElevenLabs Model: {} ({})",
            config.elevenlabs.model_id,
            config.elevenlabs.output_format
        ),
        ProviderKind::Google => tracing::info!(
            "Google Language: {} ({})",
            config.google.language_code,
            config.google.audio_encoding
        ),
        ProviderKind::OpenAi => tracing::info!(
            "OpenAI Model: {} ({})",
            config.openai.model,
            config.openai.response_format
        ),
        ProviderKind::Gemini => tracing::info!("Gemini TTS Model: {}", config.gemini.tts_model),
    }
    tracing::info!("Fallback Voice: {}", config.fallback_voice_id());
    if config.voices.filter.is_empty() {
        tracing::info!("Voice Filter: (none)");
    } else {
        tracing::info!("Voice Filter: {:?}", config.voices.filter);
    }
    tracing::info!("Analyzer Model: {}", config.analyzer.model);
    tracing::info!("Analyzer Max Image Height: {}px", config.analyzer.max_image_height);
    tracing::info!("Analyzer API Key: {}", set_or_missing(config.analyzer_api_key()));
    if !config.analyzer.game_hint.is_empty() {
        tracing::info!("Game Hint: {}", config.analyzer.game_hint);
    }
    tracing::info!("Data Directory: {:?}", config.storage.data_dir);
    tracing::info!("HTTP Timeout: {}s", config.http.timeout_secs);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

fn set_or_missing(value: Option<&str>) -> &'static str {
    if value.is_some() {
        "set"
    } else {
        "missing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.elevenlabs.api_key = Some("el-key".to_string());
        config.gemini.api_key = Some("gm-key".to_string());
        config
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validation_error_for_missing_provider_key() {
        let mut config = valid_config();
        config.provider = ProviderKind::OpenAi;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_missing_analyzer_key() {
        let mut config = valid_config();
        config.gemini.api_key = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_foreign_fallback_voice() {
        let mut config = valid_config();
        config.provider = ProviderKind::Gemini;
        config.voices.fallback_voice_id = Some("alloy".to_string());
        assert!(validate_config(&config).is_err());

        config.voices.fallback_voice_id = Some("Puck".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_image_height() {
        let mut config = valid_config();
        config.analyzer.max_image_height = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_data_dir() {
        let mut config = valid_config();
        config.storage.data_dir = Default::default();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
provider = "gemini"

[gemini]
api_key = "gm-key"

[voices]
filter = ["Kore", "Puck"]

[analyzer]
game_hint = "Final Fantasy VII"
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.voices.filter, vec!["Kore", "Puck"]);
        assert_eq!(config.analyzer.game_hint, "Final Fantasy VII");
        assert_eq!(config.analyzer.max_image_height, 720);
        assert_eq!(config.fallback_voice_id(), "Kore");
        assert_eq!(config.gemini.tts_model, "gemini-2.5-flash-preview-tts");
    }

    #[test]
    fn test_load_rejects_unknown_provider() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "provider = \"espeak\"").unwrap();
        assert!(matches!(
            load_config_from_path(Some(file.path())),
            Err(ConfigError::ParseError(_))
        ));
    }
}
