//! Fake Speech Client - 用于开发和测试
//!
//! 生成静音 WAV 并按块流式交付，可模拟空流、失败和不可解码数据

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{
    SpeechSynthesizerPort, StreamHandle, StreamSender, SynthesisError, SynthesisRequest,
    SynthesisSlot,
};
use crate::infrastructure::adapters::audio::silence_wav;

/// 模拟的合成行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FakeSynthesisMode {
    /// 正常交付静音 WAV
    #[default]
    Normal,
    /// 不交付任何块直接完成
    Empty,
    /// 交付失败信号
    Fail,
    /// 交付无法解码的字节
    Garbage,
}

/// Fake TTS 客户端配置
#[derive(Debug, Clone)]
pub struct FakeSpeechClientConfig {
    /// 首块之前的延迟
    pub latency: Duration,
    /// 每句音频时长（毫秒）
    pub audio_ms: u64,
    /// 音频拆分的块数
    pub chunk_count: usize,
    pub sample_rate: u32,
    pub mode: FakeSynthesisMode,
}

impl Default for FakeSpeechClientConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(10),
            audio_ms: 300,
            chunk_count: 3,
            sample_rate: 16_000,
            mode: FakeSynthesisMode::Normal,
        }
    }
}

/// Fake TTS 客户端
///
/// 记录收到的全部请求，便于断言合成顺序
pub struct FakeSpeechClient {
    config: FakeSpeechClientConfig,
    mode: Mutex<FakeSynthesisMode>,
    requests: Mutex<Vec<SynthesisRequest>>,
    slot: SynthesisSlot,
}

impl FakeSpeechClient {
    pub fn new(config: FakeSpeechClientConfig) -> Self {
        let mode = config.mode;
        Self {
            config,
            mode: Mutex::new(mode),
            requests: Mutex::new(Vec::new()),
            slot: SynthesisSlot::new(),
        }
    }

    /// 切换后续请求的行为
    pub fn set_mode(&self, mode: FakeSynthesisMode) {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner()) = mode;
    }

    /// 已收到的请求
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// 已请求合成的文本
    pub fn requested_texts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.text).collect()
    }

    fn current_mode(&self) -> FakeSynthesisMode {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn pump(config: FakeSpeechClientConfig, mode: FakeSynthesisMode, sender: StreamSender) {
        tokio::select! {
            _ = sender.detached() => return,
            _ = tokio::time::sleep(config.latency) => {}
        }

        match mode {
            FakeSynthesisMode::Normal => {
                let wav = silence_wav(config.audio_ms, config.sample_rate);
                let chunk_size = wav.len().div_ceil(config.chunk_count.max(1));
                for part in wav.chunks(chunk_size.max(1)) {
                    if !sender.chunk(Bytes::copy_from_slice(part)) {
                        return;
                    }
                    tokio::task::yield_now().await;
                }
                sender.complete();
            }
            FakeSynthesisMode::Empty => sender.complete(),
            FakeSynthesisMode::Fail => sender.fail("fake synthesis failure"),
            FakeSynthesisMode::Garbage => {
                sender.chunk(Bytes::from_static(b"this is not an audio container"));
                sender.complete();
            }
        }
    }
}

impl Default for FakeSpeechClient {
    fn default() -> Self {
        Self::new(FakeSpeechClientConfig::default())
    }
}

#[async_trait]
impl SpeechSynthesizerPort for FakeSpeechClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<StreamHandle, SynthesisError> {
        if request.text.trim().is_empty() {
            return Err(SynthesisError::InvalidRequest("empty text".to_string()));
        }

        let (sender, handle) = self.slot.open()?;
        let mode = self.current_mode();

        tracing::debug!(
            stream_id = handle.id(),
            text_len = request.text.len(),
            voice = %request.voice,
            mode = ?mode,
            "FakeSpeechClient: synthesizing"
        );

        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request);

        tokio::spawn(Self::pump(self.config.clone(), mode, sender));
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::StreamEvent;

    async fn collect(handle: &mut StreamHandle) -> (Vec<Bytes>, StreamEvent) {
        let mut chunks = Vec::new();
        while let Some(event) = handle.next_event().await {
            match event {
                StreamEvent::Chunk(data) => chunks.push(data),
                terminal => return (chunks, terminal),
            }
        }
        (chunks, StreamEvent::Failed("no terminal".to_string()))
    }

    #[tokio::test]
    async fn test_normal_stream_is_valid_wav() {
        let client = FakeSpeechClient::default();
        let mut handle = client
            .synthesize(SynthesisRequest::new("Hello.", "en-US-AvaNeural", 1.0))
            .await
            .unwrap();

        let (chunks, terminal) = collect(&mut handle).await;
        assert_eq!(terminal, StreamEvent::Complete);
        assert_eq!(chunks.len(), 3);

        let data: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(client.requested_texts(), vec!["Hello."]);
    }

    #[tokio::test]
    async fn test_modes() {
        let client = FakeSpeechClient::default();

        client.set_mode(FakeSynthesisMode::Empty);
        let mut handle = client
            .synthesize(SynthesisRequest::new("A.", "v", 1.0))
            .await
            .unwrap();
        let (chunks, terminal) = collect(&mut handle).await;
        assert!(chunks.is_empty());
        assert_eq!(terminal, StreamEvent::Complete);

        client.set_mode(FakeSynthesisMode::Fail);
        let mut handle = client
            .synthesize(SynthesisRequest::new("B.", "v", 1.0))
            .await
            .unwrap();
        let (_, terminal) = collect(&mut handle).await;
        assert!(matches!(terminal, StreamEvent::Failed(_)));
    }

    #[tokio::test]
    async fn test_busy_until_detached() {
        let client = FakeSpeechClient::new(FakeSpeechClientConfig {
            latency: Duration::from_secs(5),
            ..Default::default()
        });

        let mut first = client
            .synthesize(SynthesisRequest::new("A.", "v", 1.0))
            .await
            .unwrap();
        let err = client
            .synthesize(SynthesisRequest::new("B.", "v", 1.0))
            .await
            .unwrap_err();
        assert_eq!(err, SynthesisError::Busy);

        first.detach();
        assert!(client
            .synthesize(SynthesisRequest::new("B.", "v", 1.0))
            .await
            .is_ok());
    }
}
