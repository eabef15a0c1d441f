//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsProvider};

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
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 句间停顿上限（毫秒）
const MAX_PACING_MS: u64 = 5_000;

/// 打开阅读页的重试次数上限
const MAX_OPEN_RETRY_ATTEMPTS: u32 = 50;

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `LECTOR_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `LECTOR_SERVER__PORT=8080`
/// - `LECTOR_TTS__URL=http://tts-server:8000`
/// - `LECTOR_TTS__PROVIDER=fake`
/// - `LECTOR_PLAYBACK__OUTPUT=speaker`
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
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5070)?
        .set_default("tts.provider", "http")?
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 60)?
        .set_default("playback.output", "null")?
        .set_default("playback.pacing_ms", 200)?
        .set_default("reader.open_retry_attempts", 15)?
        .set_default("reader.open_retry_interval_ms", 150)?
        .set_default("reader.paragraph_breaks", false)?
        .set_default("settings.path", "data/settings.sled")?
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
    // 例如: LECTOR_TTS__URL=http://tts-server:8000
    builder = builder.add_source(
        Environment::with_prefix("LECTOR")
            .prefix_separator("_")
            .separator("__")
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
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.tts.provider == TtsProvider::Http && config.tts.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.tts.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "TTS timeout cannot be 0".to_string(),
        ));
    }

    let attempts = config.reader.open_retry_attempts;
    if attempts == 0 || attempts > MAX_OPEN_RETRY_ATTEMPTS {
        return Err(ConfigError::ValidationError(format!(
            "reader.open_retry_attempts must be between 1 and {}",
            MAX_OPEN_RETRY_ATTEMPTS
        )));
    }

    if config.playback.pacing_ms > MAX_PACING_MS {
        return Err(ConfigError::ValidationError(format!(
            "playback.pacing_ms cannot exceed {}",
            MAX_PACING_MS
        )));
    }

    if config.settings.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Settings path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("TTS Provider: {:?}", config.tts.provider);
    tracing::info!("TTS URL: {}", config.tts.url);
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!("Audio Output: {:?}", config.playback.output);
    tracing::info!("Sentence Pacing: {}ms", config.playback.pacing_ms);
    tracing::info!(
        "Reader Open Retry: {} x {}ms",
        config.reader.open_retry_attempts,
        config.reader.open_retry_interval_ms
    );
    tracing::info!("Settings Store: {}", config.settings.path);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_tts_url_only_matters_for_http() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_err());

        config.tts.provider = TtsProvider::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_bounds() {
        let mut config = AppConfig::default();
        config.reader.open_retry_attempts = 0;
        assert!(validate_config(&config).is_err());

        config.reader.open_retry_attempts = 51;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.playback.pacing_ms = 10_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[tts]\nprovider = \"fake\"\n\n[playback]\npacing_ms = 50\n\n[reader]\nparagraph_breaks = true"
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.tts.provider, TtsProvider::Fake);
        assert_eq!(config.playback.pacing_ms, 50);
        assert!(config.reader.paragraph_breaks);
        assert_eq!(config.server.port, 5070);
    }
}
