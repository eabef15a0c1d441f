//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::transport::RetryPolicy;
use crate::domain::SegmentConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// TTS 服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 阅读页配置
    #[serde(default)]
    pub reader: ReaderConfig,

    /// 用户设置存储配置
    #[serde(default)]
    pub settings: SettingsConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// TTS 提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// 外部 HTTP 流式服务
    #[default]
    Http,
    /// 本地静音替身（离线运行）
    Fake,
}

/// TTS 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,

    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 单句请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 输出音频格式
    #[serde(default = "default_tts_format")]
    pub format: String,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    60
}

fn default_tts_format() -> String {
    "audio-24khz-48kbitrate-mono-mp3".to_string()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            format: default_tts_format(),
        }
    }
}

/// 音频输出设备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDevice {
    /// 无声输出（按时长计时）
    #[default]
    Null,
    /// 系统扬声器（需要 `speaker` feature）
    Speaker,
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub output: OutputDevice,

    /// 句间停顿（毫秒）
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_pacing_ms() -> u64 {
    200
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            output: OutputDevice::default(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl PlaybackConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// 阅读页配置
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    /// 打开阅读页的最大尝试次数
    #[serde(default = "default_open_retry_attempts")]
    pub open_retry_attempts: u32,

    /// 尝试间隔（毫秒）
    #[serde(default = "default_open_retry_interval_ms")]
    pub open_retry_interval_ms: u64,

    /// 空行段落也作为句子边界
    #[serde(default)]
    pub paragraph_breaks: bool,
}

fn default_open_retry_attempts() -> u32 {
    15
}

fn default_open_retry_interval_ms() -> u64 {
    150
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            open_retry_attempts: default_open_retry_attempts(),
            open_retry_interval_ms: default_open_retry_interval_ms(),
            paragraph_breaks: false,
        }
    }
}

impl ReaderConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.open_retry_attempts,
            Duration::from_millis(self.open_retry_interval_ms),
        )
    }

    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            paragraph_breaks: self.paragraph_breaks,
        }
    }
}

/// 用户设置存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Sled 数据库路径
    #[serde(default = "default_settings_path")]
    pub path: String,
}

fn default_settings_path() -> String {
    "data/settings.sled".to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
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
