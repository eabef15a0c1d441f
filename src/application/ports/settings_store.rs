//! Settings Store Port - 用户设置存储抽象
//!
//! 简单的键值存储协作方：保存默认音色和语速

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::reading::{DEFAULT_RATE, DEFAULT_VOICE};

/// 设置存储错误
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 朗读设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderSettings {
    pub voice: String,
    pub speed: f32,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            speed: DEFAULT_RATE,
        }
    }
}

/// Settings Store Port
#[async_trait]
pub trait SettingsStorePort: Send + Sync {
    /// 读取设置；未设置时返回默认值
    async fn get_settings(&self) -> Result<ReaderSettings, SettingsError>;

    /// 保存设置
    async fn save_settings(&self, settings: &ReaderSettings) -> Result<(), SettingsError>;
}
