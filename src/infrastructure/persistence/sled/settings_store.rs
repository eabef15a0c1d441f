//! Sled-based Settings Store Implementation

use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{ReaderSettings, SettingsError, SettingsStorePort};

const SETTINGS_KEY: &[u8] = b"settings";

/// Sled 设置存储配置
#[derive(Debug, Clone)]
pub struct SledSettingsConfig {
    /// 数据库路径
    pub db_path: String,
}

impl Default for SledSettingsConfig {
    fn default() -> Self {
        Self {
            db_path: "data/settings.sled".to_string(),
        }
    }
}

/// Sled 设置存储
///
/// 设置以 JSON 形式保存在单个键下
pub struct SledSettingsStore {
    db: Db,
}

impl SledSettingsStore {
    pub fn new(config: &SledSettingsConfig) -> Result<Self, SettingsError> {
        let db = sled::open(&config.db_path).map_err(|e| SettingsError::Storage(e.to_string()))?;

        tracing::info!(db_path = %config.db_path, "SledSettingsStore initialized");

        Ok(Self { db })
    }

    /// 打开现有存储
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let config = SledSettingsConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl SettingsStorePort for SledSettingsStore {
    async fn get_settings(&self) -> Result<ReaderSettings, SettingsError> {
        let value = self
            .db
            .get(SETTINGS_KEY)
            .map_err(|e| SettingsError::Storage(e.to_string()))?;

        match value {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| SettingsError::Serialization(e.to_string())),
            None => Ok(ReaderSettings::default()),
        }
    }

    async fn save_settings(&self, settings: &ReaderSettings) -> Result<(), SettingsError> {
        let bytes =
            serde_json::to_vec(settings).map_err(|e| SettingsError::Serialization(e.to_string()))?;

        self.db
            .insert(SETTINGS_KEY, bytes)
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        self.db
            .flush_async()
            .await
            .map_err(|e| SettingsError::Storage(e.to_string()))?;

        tracing::debug!(voice = %settings.voice, speed = settings.speed, "Settings persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_settings_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.sled");

        {
            let store = SledSettingsStore::open(&path).unwrap();
            assert_eq!(store.get_settings().await.unwrap(), ReaderSettings::default());

            store
                .save_settings(&ReaderSettings {
                    voice: "en-US-GuyNeural".to_string(),
                    speed: 1.25,
                })
                .await
                .unwrap();
        }

        let store = SledSettingsStore::open(&path).unwrap();
        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings.voice, "en-US-GuyNeural");
        assert_eq!(settings.speed, 1.25);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_serialization_error() {
        let dir = tempdir().unwrap();
        let store = SledSettingsStore::open(dir.path().join("s.sled")).unwrap();
        store.db.insert(SETTINGS_KEY, b"{not json".to_vec()).unwrap();

        let err = store.get_settings().await.unwrap_err();
        assert!(matches!(err, SettingsError::Serialization(_)));
    }
}
