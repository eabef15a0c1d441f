//! Null Output - 无声输出设备
//!
//! 不接真实声卡，按解码时长"播放"。用于无头运行和测试。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::application::ports::{
    AudioError, AudioOutputPort, ContextState, DecodedAudio, OutputContext, PlaybackNode,
};

/// Null 输出配置
#[derive(Debug, Clone)]
pub struct NullOutputConfig {
    /// 新上下文以挂起状态创建
    pub start_suspended: bool,
    /// 恢复挂起上下文时失败
    pub fail_resume: bool,
    /// 打开上下文时失败
    pub fail_open: bool,
    /// 播放时长倍率（1.0 为实时）
    pub time_scale: f32,
}

impl Default for NullOutputConfig {
    fn default() -> Self {
        Self {
            start_suspended: false,
            fail_resume: false,
            fail_open: false,
            time_scale: 1.0,
        }
    }
}

/// Null 输出设备
pub struct NullOutput {
    config: NullOutputConfig,
    opened: Arc<AtomicUsize>,
}

impl NullOutput {
    pub fn new(config: NullOutputConfig) -> Self {
        Self {
            config,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 已打开的上下文数量
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new(NullOutputConfig::default())
    }
}

impl AudioOutputPort for NullOutput {
    fn name(&self) -> &'static str {
        "null"
    }

    fn open(&self) -> Result<Box<dyn OutputContext>, AudioError> {
        if self.config.fail_open {
            return Err(AudioError::DeviceUnavailable(
                "null output configured to fail".to_string(),
            ));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let state = if self.config.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        Ok(Box::new(NullContext {
            state: Mutex::new(state),
            fail_resume: self.config.fail_resume,
            time_scale: self.config.time_scale.max(0.0),
        }))
    }
}

struct NullContext {
    state: Mutex<ContextState>,
    fail_resume: bool,
    time_scale: f32,
}

impl NullContext {
    fn current(&self) -> ContextState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set(&self, state: ContextState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = state;
    }
}

impl OutputContext for NullContext {
    fn state(&self) -> ContextState {
        self.current()
    }

    fn resume(&self) -> Result<(), AudioError> {
        match self.current() {
            ContextState::Closed => Err(AudioError::DeviceUnavailable(
                "context closed".to_string(),
            )),
            ContextState::Suspended if self.fail_resume => Err(AudioError::DeviceUnavailable(
                "resume rejected".to_string(),
            )),
            _ => {
                self.set(ContextState::Running);
                Ok(())
            }
        }
    }

    fn connect(&self, audio: DecodedAudio) -> Result<Box<dyn PlaybackNode>, AudioError> {
        if self.current() == ContextState::Closed {
            return Err(AudioError::DeviceUnavailable("context closed".to_string()));
        }
        let duration = audio.duration().mul_f32(self.time_scale);
        Ok(Box::new(NullNode {
            duration,
            timer: None,
            stopped: false,
        }))
    }

    fn close(&self) {
        self.set(ContextState::Closed);
    }
}

struct NullNode {
    duration: Duration,
    timer: Option<JoinHandle<()>>,
    stopped: bool,
}

impl PlaybackNode for NullNode {
    fn start(&mut self) -> Result<oneshot::Receiver<()>, AudioError> {
        if self.timer.is_some() || self.stopped {
            return Err(AudioError::Playback("node already started".to_string()));
        }
        let (tx, rx) = oneshot::channel();
        let duration = self.duration;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(());
        }));
        Ok(rx)
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let finished = self.timer.as_ref().map(|t| t.is_finished()).unwrap_or(false);
        if self.stopped || finished {
            return Err(AudioError::AlreadyStopped);
        }
        self.stopped = true;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(ms: usize) -> DecodedAudio {
        DecodedAudio::new(vec![0.0; ms * 8], 8_000, 1)
    }

    #[tokio::test]
    async fn test_node_ends_naturally() {
        let output = NullOutput::default();
        let ctx = output.open().unwrap();
        let mut node = ctx.connect(audio(20)).unwrap();

        let ended = node.start().unwrap();
        assert!(tokio::time::timeout(Duration::from_secs(1), ended).await.is_ok());
        tokio::time::sleep(Duration::from_millis(20)).await;

        // 已结束的节点再次 stop 属于预期错误
        assert_eq!(node.stop(), Err(AudioError::AlreadyStopped));
    }

    #[tokio::test]
    async fn test_double_stop() {
        let output = NullOutput::default();
        let ctx = output.open().unwrap();
        let mut node = ctx.connect(audio(1_000)).unwrap();

        let _ended = node.start().unwrap();
        assert!(node.stop().is_ok());
        assert_eq!(node.stop(), Err(AudioError::AlreadyStopped));
    }

    #[test]
    fn test_closed_context_rejects_connect() {
        let output = NullOutput::default();
        let ctx = output.open().unwrap();
        ctx.close();
        ctx.close();
        assert_eq!(ctx.state(), ContextState::Closed);
        assert!(ctx.connect(audio(10)).is_err());
        assert_eq!(output.opened_count(), 1);
    }
}
