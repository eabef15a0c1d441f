//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechSynthesizer、AudioOutput、SettingsStore、ReaderEvents）
//! - playback: 单句音频播放引擎
//! - reading: 朗读会话控制器（核心状态机）
//! - commands: 阅读页请求/响应载荷
//! - transport: 请求分发与出站事件中继
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod playback;
pub mod ports;
pub mod reading;
pub mod transport;

// Re-exports
pub use commands::{ReaderRequest, ReaderResponse, ResponseStatus};
pub use error::ApplicationError;
pub use playback::{AudioPlaybackEngine, PlaybackOutcome};
pub use ports::{
    AudioDecoderPort, AudioError, AudioOutputPort, ReaderEvent, ReaderEventPort, ReaderSettings,
    SettingsError, SettingsStorePort, SpeechSynthesizerPort, StreamEvent, StreamHandle,
    SynthesisError, SynthesisRequest, TransportError,
};
pub use reading::{ControllerConfig, ReadingSessionController};
pub use transport::{PageContext, RetryPolicy, SessionTransport};
