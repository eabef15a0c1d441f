//! Audio Playback Engine
//!
//! 将一个完整的编码音频缓冲区解码并播放到结束。
//! 输出上下文懒创建、会话内复用、关闭后重建；每次播放使用新的播放节点。

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

use crate::application::ports::{
    AudioDecoderPort, AudioError, AudioOutputPort, ContextState, DecodedAudio, OutputContext,
    PlaybackNode,
};

/// 一次播放的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// 自然播放结束
    Completed,
    /// 被 stop() 提前结束（暂停/跳转/停止）
    Stopped,
}

struct ActiveNode {
    id: u64,
    node: Box<dyn PlaybackNode>,
    stop_tx: Option<oneshot::Sender<()>>,
}

/// 音频播放引擎
///
/// 同一时间最多持有一个播放节点
pub struct AudioPlaybackEngine {
    decoder: Arc<dyn AudioDecoderPort>,
    output: Arc<dyn AudioOutputPort>,
    context: Mutex<Option<Box<dyn OutputContext>>>,
    active: Mutex<Option<ActiveNode>>,
    next_node_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 播放 future 被丢弃时释放节点
struct NodeGuard<'a> {
    engine: &'a AudioPlaybackEngine,
    id: u64,
}

impl Drop for NodeGuard<'_> {
    fn drop(&mut self) {
        self.engine.release(self.id);
    }
}

impl AudioPlaybackEngine {
    pub fn new(decoder: Arc<dyn AudioDecoderPort>, output: Arc<dyn AudioOutputPort>) -> Self {
        Self {
            decoder,
            output,
            context: Mutex::new(None),
            active: Mutex::new(None),
            next_node_id: AtomicU64::new(1),
        }
    }

    /// 输出设备名称
    pub fn output_name(&self) -> &'static str {
        self.output.name()
    }

    /// 是否有节点正在播放
    pub fn is_playing(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// 是否持有输出上下文
    pub fn has_context(&self) -> bool {
        lock(&self.context)
            .as_ref()
            .map(|ctx| ctx.state() != ContextState::Closed)
            .unwrap_or(false)
    }

    /// 解码并播放完整的音频缓冲区
    ///
    /// 自然结束返回 `Completed`；被 `stop()` 打断返回 `Stopped`
    pub async fn play_encoded_audio(&self, chunks: &[Bytes]) -> Result<PlaybackOutcome, AudioError> {
        let total: usize = chunks.iter().map(Bytes::len).sum();
        if total == 0 {
            return Err(AudioError::Decode("empty audio buffer".to_string()));
        }

        let mut buffer = Vec::with_capacity(total);
        for chunk in chunks {
            buffer.extend_from_slice(chunk);
        }

        let decoder = self.decoder.clone();
        let audio = tokio::task::spawn_blocking(move || decoder.decode(&buffer))
            .await
            .map_err(|e| AudioError::Decode(format!("decode task failed: {}", e)))??;

        if audio.is_empty() {
            return Err(AudioError::Decode("audio contains no samples".to_string()));
        }

        tracing::debug!(
            bytes = total,
            duration_ms = audio.duration_ms,
            sample_rate = audio.sample_rate,
            channels = audio.channels,
            "Audio decoded"
        );

        let (id, ended_rx, stop_rx) = self.start_node(audio)?;
        let _guard = NodeGuard { engine: self, id };

        let outcome = tokio::select! {
            ended = ended_rx => match ended {
                Ok(()) => PlaybackOutcome::Completed,
                Err(_) if self.is_active(id) => {
                    return Err(AudioError::Playback(
                        "playback node ended without signal".to_string(),
                    ));
                }
                Err(_) => PlaybackOutcome::Stopped,
            },
            _ = stop_rx => PlaybackOutcome::Stopped,
        };

        tracing::debug!(node_id = id, outcome = ?outcome, "Playback settled");
        Ok(outcome)
    }

    /// 停止当前节点（无节点时为空操作）
    ///
    /// 停止已结束节点的错误属于预期竞争，直接忽略
    pub fn stop(&self) -> bool {
        let active = lock(&self.active).take();
        match active {
            Some(mut active) => {
                if let Err(e) = active.node.stop() {
                    tracing::debug!(node_id = active.id, error = %e, "Ignoring node stop error");
                }
                active.node.disconnect();
                if let Some(tx) = active.stop_tx.take() {
                    let _ = tx.send(());
                }
                tracing::debug!(node_id = active.id, "Playback node stopped");
                true
            }
            None => false,
        }
    }

    /// 停止播放并释放输出上下文（完整会话停止）
    pub fn close(&self) {
        self.stop();
        if let Some(ctx) = lock(&self.context).take() {
            ctx.close();
            tracing::debug!(output = self.output.name(), "Audio output context closed");
        }
    }

    fn is_active(&self, id: u64) -> bool {
        lock(&self.active)
            .as_ref()
            .map(|active| active.id == id)
            .unwrap_or(false)
    }

    /// 释放指定节点（仅当它仍是当前节点）
    fn release(&self, id: u64) {
        let mut active = lock(&self.active);
        if active.as_ref().map(|a| a.id == id).unwrap_or(false) {
            if let Some(mut node) = active.take() {
                node.node.disconnect();
            }
        }
    }

    /// 确保输出上下文可用：不存在或已关闭则创建，挂起则恢复
    fn ensure_context(
        &self,
        context: &mut Option<Box<dyn OutputContext>>,
    ) -> Result<(), AudioError> {
        let needs_open = context
            .as_ref()
            .map(|ctx| ctx.state() == ContextState::Closed)
            .unwrap_or(true);

        if needs_open {
            let ctx = self.output.open().map_err(|e| match e {
                AudioError::DeviceUnavailable(msg) => AudioError::DeviceUnavailable(msg),
                other => AudioError::DeviceUnavailable(other.to_string()),
            })?;
            tracing::info!(output = self.output.name(), "Audio output context opened");
            *context = Some(ctx);
        }

        if let Some(ctx) = context.as_ref() {
            if ctx.state() == ContextState::Suspended {
                ctx.resume().map_err(|e| {
                    AudioError::DeviceUnavailable(format!("failed to resume output context: {}", e))
                })?;
                tracing::debug!(output = self.output.name(), "Audio output context resumed");
            }
        }

        Ok(())
    }

    fn start_node(
        &self,
        audio: DecodedAudio,
    ) -> Result<(u64, oneshot::Receiver<()>, oneshot::Receiver<()>), AudioError> {
        let mut context = lock(&self.context);
        self.ensure_context(&mut context)?;
        let ctx = context
            .as_ref()
            .ok_or_else(|| AudioError::DeviceUnavailable("no output context".to_string()))?;

        // 新节点之前释放旧节点
        self.stop();

        let mut node = ctx.connect(audio)?;
        let ended_rx = match node.start() {
            Ok(rx) => rx,
            Err(e) => {
                node.disconnect();
                return Err(e);
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let id = self.next_node_id.fetch_add(1, Ordering::SeqCst);
        *lock(&self.active) = Some(ActiveNode {
            id,
            node,
            stop_tx: Some(stop_tx),
        });

        Ok((id, ended_rx, stop_rx))
    }
}
