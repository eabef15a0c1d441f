//! Audio Output Port - 解码与输出设备抽象
//!
//! 输出上下文（device context）按会话懒创建并复用；
//! 每次播放连接一个新的播放节点（playback node）

use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// 音频错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Playback node already stopped")]
    AlreadyStopped,
}

/// 解码后的 PCM 音频（交错 f32 样本）
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u64,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let duration_ms = if sample_rate > 0 && channels > 0 {
            (samples.len() as u64 * 1000) / (sample_rate as u64 * channels as u64)
        } else {
            0
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration_ms,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// 输出上下文状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// 音频解码器
///
/// 输入必须是完整、自包含的音频容器（WAV/MP3）
pub trait AudioDecoderPort: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedAudio, AudioError>;
}

/// 音频输出设备
pub trait AudioOutputPort: Send + Sync {
    /// 设备名称（用于日志）
    fn name(&self) -> &'static str;

    /// 打开一个输出上下文
    fn open(&self) -> Result<Box<dyn OutputContext>, AudioError>;
}

/// 输出上下文
pub trait OutputContext: Send + Sync {
    fn state(&self) -> ContextState;

    /// 恢复挂起的上下文
    fn resume(&self) -> Result<(), AudioError>;

    /// 为一段音频创建新的播放节点
    fn connect(&self, audio: DecodedAudio) -> Result<Box<dyn PlaybackNode>, AudioError>;

    /// 关闭上下文；重复关闭无副作用
    fn close(&self);
}

/// 播放节点（一次性）
pub trait PlaybackNode: Send + Sync {
    /// 开始播放，返回自然结束信号
    fn start(&mut self) -> Result<oneshot::Receiver<()>, AudioError>;

    /// 提前停止；已停止时返回 `AudioError::AlreadyStopped`
    fn stop(&mut self) -> Result<(), AudioError>;

    /// 断开与上下文的连接
    fn disconnect(&mut self);
}
