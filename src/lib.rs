//! Lector - 网页文章 TTS 朗读服务
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Reading Context: 会话状态、阶段、错误
//! - 文章值对象与文本分句器
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SpeechSynthesizer, AudioOutput, SettingsStore, ReaderEvents）
//! - Playback: 音频播放引擎
//! - Reading: 朗读会话控制器（逐句合成、播放、暂停、跳转）
//! - Transport: 阅读页请求分发与重试
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Adapters: HTTP/Fake TTS 客户端, Symphonia 解码, 音频输出
//! - Persistence: Sled 设置存储
//! - Memory: 内存设置存储
//! - Events: 阅读页事件广播

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
