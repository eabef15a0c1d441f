//! Speech Synthesizer Port - 流式 TTS 合成抽象
//!
//! 合成结果以字节块流的形式交付：零个或多个音频块，随后恰好一个终止信号
//! （`Complete` 或 `Failed`）。适配器不做任何缓冲，只负责透传。

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 合成错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("Another synthesis stream is still in flight")]
    Busy,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No audio data produced")]
    NoAudio,
}

/// 合成请求
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// 要合成的文本
    pub text: String,
    /// 音色标识（如 en-US-AvaNeural）
    pub voice: String,
    /// 语速倍率，1.0 为正常
    pub rate: f32,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>, rate: f32) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            rate,
        }
    }
}

/// 流事件
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// 一块不透明的编码音频字节
    Chunk(Bytes),
    /// 正常结束
    Complete,
    /// 失败结束
    Failed(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Chunk(_))
    }
}

/// 单个适配器实例上的在途流占用标记
///
/// 同一时间只允许一个流处于未终止状态；终止信号发出或订阅方 detach 时释放
#[derive(Debug, Default)]
pub struct SynthesisSlot {
    active: Arc<AtomicU64>,
    next_id: AtomicU64,
}

impl SynthesisSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否有在途的流
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::SeqCst) != 0
    }

    /// 打开新流，返回生产端和订阅端
    pub fn open(&self) -> Result<(StreamSender, StreamHandle), SynthesisError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.active
            .compare_exchange(0, id, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SynthesisError::Busy)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let lease = Arc::new(SlotLease {
            active: self.active.clone(),
            id,
        });

        let sender = StreamSender {
            tx,
            cancel: cancel.clone(),
            lease: lease.clone(),
            terminated: false,
        };
        let handle = StreamHandle {
            id,
            rx,
            cancel,
            lease,
            finished: false,
        };
        Ok((sender, handle))
    }
}

#[derive(Debug)]
struct SlotLease {
    active: Arc<AtomicU64>,
    id: u64,
}

impl SlotLease {
    fn release(&self) {
        let _ = self
            .active
            .compare_exchange(self.id, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// 流的生产端（由适配器持有）
///
/// 保证恰好发出一个终止信号：未显式结束就被丢弃时发送 `Failed`
#[derive(Debug)]
pub struct StreamSender {
    tx: mpsc::UnboundedSender<StreamEvent>,
    cancel: CancellationToken,
    lease: Arc<SlotLease>,
    terminated: bool,
}

impl StreamSender {
    /// 订阅方是否已 detach
    pub fn is_detached(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// 等待订阅方 detach
    pub async fn detached(&self) {
        self.cancel.cancelled().await
    }

    /// 推送一个音频块；订阅方已 detach 时返回 false
    pub fn chunk(&self, data: Bytes) -> bool {
        if self.is_detached() {
            return false;
        }
        self.tx.send(StreamEvent::Chunk(data)).is_ok()
    }

    pub fn complete(mut self) {
        self.finish(StreamEvent::Complete);
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.finish(StreamEvent::Failed(reason.into()));
    }

    fn finish(&mut self, event: StreamEvent) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        let _ = self.tx.send(event);
        self.lease.release();
    }
}

impl Drop for StreamSender {
    fn drop(&mut self) {
        self.finish(StreamEvent::Failed("synthesis stream dropped".to_string()));
    }
}

/// 流的订阅端（由控制器持有，每句一个）
///
/// `detach` 后不再交付任何数据；Drop 时自动 detach
#[derive(Debug)]
pub struct StreamHandle {
    id: u64,
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    cancel: CancellationToken,
    lease: Arc<SlotLease>,
    finished: bool,
}

impl StreamHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 是否已收到终止信号或已 detach
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 读取下一个事件；终止信号之后返回 None
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        let event = self
            .rx
            .recv()
            .await
            .unwrap_or_else(|| StreamEvent::Failed("synthesis stream closed".to_string()));
        if event.is_terminal() {
            self.finished = true;
        }
        Some(event)
    }

    /// 取消订阅并通知生产端停止
    pub fn detach(&mut self) {
        self.cancel.cancel();
        self.rx.close();
        self.lease.release();
        self.finished = true;
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Speech Synthesizer Port
///
/// 远端神经网络 TTS 服务的抽象接口
#[async_trait]
pub trait SpeechSynthesizerPort: Send + Sync {
    /// 开始一次流式合成
    ///
    /// 上一个流未终止且未 detach 时返回 `SynthesisError::Busy`
    async fn synthesize(&self, request: SynthesisRequest) -> Result<StreamHandle, SynthesisError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
