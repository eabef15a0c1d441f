//! Application State
//!
//! HTTP/WebSocket 处理器共享的应用状态

use std::sync::Arc;

use crate::application::ports::{SettingsStorePort, SpeechSynthesizerPort};
use crate::application::transport::SessionTransport;
use crate::infrastructure::events::EventPublisher;

/// 应用状态
pub struct AppState {
    /// 请求分发（唯一的页面上下文）
    pub transport: Arc<SessionTransport>,
    /// 阅读页事件广播
    pub event_publisher: Arc<EventPublisher>,
    pub settings: Arc<dyn SettingsStorePort>,
    pub synthesizer: Arc<dyn SpeechSynthesizerPort>,
}

impl AppState {
    pub fn new(
        transport: Arc<SessionTransport>,
        event_publisher: Arc<EventPublisher>,
        settings: Arc<dyn SettingsStorePort>,
        synthesizer: Arc<dyn SpeechSynthesizerPort>,
    ) -> Self {
        Self {
            transport,
            event_publisher,
            settings,
            synthesizer,
        }
    }
}
