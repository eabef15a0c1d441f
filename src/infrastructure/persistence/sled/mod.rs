//! Sled 嵌入式键值存储

mod settings_store;

pub use settings_store::{SledSettingsConfig, SledSettingsStore};
