//! Event Publisher Implementation
//!
//! 阅读页事件推送实现（WebSocket 订阅方）

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{ReaderEvent, ReaderEventPort, TransportError};

/// 广播通道容量
const CHANNEL_CAPACITY: usize = 256;

/// 事件发布器
///
/// 所有已连接的阅读页共享一个广播通道
pub struct EventPublisher {
    channel: broadcast::Sender<ReaderEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅阅读页事件
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.channel.subscribe()
    }
}

impl ReaderEventPort for EventPublisher {
    fn publish(&self, event: ReaderEvent) -> Result<(), TransportError> {
        let name = event.name();
        match self.channel.send(event) {
            Ok(receivers) => {
                tracing::trace!(event = name, receivers = receivers, "Reader event published");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(
                    event = name,
                    error = %e,
                    "Failed to publish reader event (no receivers)"
                );
                Err(TransportError::Unreachable)
            }
        }
    }

    fn receiver_count(&self) -> usize {
        self.channel.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_receivers_is_unreachable() {
        let publisher = EventPublisher::new();
        assert_eq!(publisher.receiver_count(), 0);

        let err = publisher
            .publish(ReaderEvent::ReadingStopped { close_reader: false })
            .unwrap_err();
        assert_eq!(err, TransportError::Unreachable);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();
        assert_eq!(publisher.receiver_count(), 1);

        publisher
            .publish(ReaderEvent::UpdateReaderHighlight {
                index: 0,
                text: "One.".to_string(),
            })
            .unwrap();
        publisher
            .publish(ReaderEvent::ReadingStopped { close_reader: false })
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().name(), "updateReaderHighlight");
        assert_eq!(rx.recv().await.unwrap().name(), "readingStopped");
    }
}
