//! In-Memory Settings Store Implementation

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::ports::{ReaderSettings, SettingsError, SettingsStorePort};

/// 内存设置存储
pub struct InMemorySettingsStore {
    settings: RwLock<Option<ReaderSettings>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(None),
        }
    }

    /// 以给定设置初始化
    pub fn with_settings(settings: ReaderSettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStorePort for InMemorySettingsStore {
    async fn get_settings(&self) -> Result<ReaderSettings, SettingsError> {
        Ok(self.settings.read().await.clone().unwrap_or_default())
    }

    async fn save_settings(&self, settings: &ReaderSettings) -> Result<(), SettingsError> {
        *self.settings.write().await = Some(settings.clone());
        tracing::debug!(voice = %settings.voice, speed = settings.speed, "Settings saved");
        Ok(())
    }
}
