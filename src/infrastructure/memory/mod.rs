//! Memory Layer - In-Memory State Management
//!
//! 设置存储的内存实现（测试与无持久化运行）

mod settings_store;

pub use settings_store::InMemorySettingsStore;
