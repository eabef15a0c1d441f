//! HTTP Speech Client - 调用外部流式 TTS HTTP 服务
//!
//! 实现 SpeechSynthesizerPort，响应体按到达顺序逐块转发
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/stream
//! Request: {"text": "...", "voice": "en-US-AvaNeural", "rate": "+0%", "format": "..."}  (JSON)
//! Response: 编码音频（chunked transfer）

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    SpeechSynthesizerPort, StreamHandle, StreamSender, SynthesisError, SynthesisRequest,
    SynthesisSlot,
};

/// 默认输出格式（单声道 MP3）
pub const DEFAULT_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// TTS 流式请求体 (JSON)
#[derive(Debug, Clone, Serialize)]
struct TtsStreamRequest {
    text: String,
    voice: String,
    /// 语速，形如 "+25%" / "-10%"
    rate: String,
    format: String,
}

/// 将语速倍率转换为带符号百分比
pub fn format_rate(rate: f32) -> String {
    let percent = ((rate - 1.0) * 100.0).round() as i32;
    format!("{:+}%", percent)
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpSpeechClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 单句请求超时时间（秒）
    pub timeout_secs: u64,
    /// 输出音频格式
    pub output_format: String,
}

impl Default for HttpSpeechClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
        }
    }
}

impl HttpSpeechClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpSpeechClient {
    client: Client,
    config: HttpSpeechClientConfig,
    slot: SynthesisSlot,
}

impl HttpSpeechClient {
    pub fn new(config: HttpSpeechClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            slot: SynthesisSlot::new(),
        })
    }

    fn stream_url(&self) -> String {
        format!("{}/api/tts/stream", self.config.base_url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }

    fn describe(e: &reqwest::Error) -> String {
        if e.is_timeout() {
            SynthesisError::Timeout.to_string()
        } else if e.is_connect() {
            format!("Cannot connect to TTS service: {}", e)
        } else {
            e.to_string()
        }
    }

    /// 发送请求并把响应体逐块转发给订阅方
    async fn pump(client: Client, url: String, body: TtsStreamRequest, sender: StreamSender) {
        let text_len = body.text.len();

        let response = tokio::select! {
            _ = sender.detached() => {
                tracing::debug!(url = %url, "TTS request abandoned before response");
                return;
            }
            res = client.post(&url).json(&body).send() => res,
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                let reason = Self::describe(&e);
                tracing::warn!(url = %url, error = %reason, "TTS request failed");
                sender.fail(reason);
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "TTS service returned error");
            sender.fail(
                SynthesisError::Service(format!("HTTP {}: {}", status, error_text)).to_string(),
            );
            return;
        }

        let mut stream = response.bytes_stream();
        let mut chunk_count = 0usize;
        let mut total_bytes = 0usize;

        loop {
            tokio::select! {
                _ = sender.detached() => {
                    tracing::debug!(chunks = chunk_count, "TTS stream detached by subscriber");
                    return;
                }
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        chunk_count += 1;
                        total_bytes += chunk.len();
                        if !sender.chunk(chunk) {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        let reason = Self::describe(&e);
                        tracing::warn!(chunks = chunk_count, error = %reason, "TTS stream broken");
                        sender.fail(reason);
                        return;
                    }
                    None => break,
                },
            }
        }

        tracing::debug!(
            text_len = text_len,
            chunks = chunk_count,
            audio_size = total_bytes,
            "TTS stream completed"
        );
        sender.complete();
    }
}

#[async_trait]
impl SpeechSynthesizerPort for HttpSpeechClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<StreamHandle, SynthesisError> {
        if request.text.trim().is_empty() {
            return Err(SynthesisError::InvalidRequest("empty text".to_string()));
        }
        if request.voice.is_empty() {
            return Err(SynthesisError::InvalidRequest("empty voice".to_string()));
        }

        let (sender, handle) = self.slot.open()?;

        let body = TtsStreamRequest {
            text: request.text,
            voice: request.voice,
            rate: format_rate(request.rate),
            format: self.config.output_format.clone(),
        };

        tracing::debug!(
            url = %self.stream_url(),
            stream_id = handle.id(),
            text_len = body.text.len(),
            voice = %body.voice,
            rate = %body.rate,
            "Sending TTS stream request"
        );

        tokio::spawn(Self::pump(
            self.client.clone(),
            self.stream_url(),
            body,
            sender,
        ));

        Ok(handle)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::StreamEvent;

    #[test]
    fn test_config_default() {
        let config = HttpSpeechClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpSpeechClientConfig::new("http://example.com:9000").with_timeout(30);
        assert_eq!(config.base_url, "http://example.com:9000");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1.0), "+0%");
        assert_eq!(format_rate(1.25), "+25%");
        assert_eq!(format_rate(0.8), "-20%");
        assert_eq!(format_rate(2.0), "+100%");
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = HttpSpeechClient::new(HttpSpeechClientConfig::new("http://tts:8000/")).unwrap();
        assert_eq!(client.stream_url(), "http://tts:8000/api/tts/stream");
        assert_eq!(client.health_url(), "http://tts:8000/health");
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_stream() {
        // 端口 9 (discard) 通常没有 HTTP 服务
        let config = HttpSpeechClientConfig::new("http://127.0.0.1:9").with_timeout(2);
        let client = HttpSpeechClient::new(config).unwrap();

        let mut handle = client
            .synthesize(SynthesisRequest::new("Hello.", "en-US-AvaNeural", 1.0))
            .await
            .unwrap();

        let event = handle.next_event().await;
        assert!(matches!(event, Some(StreamEvent::Failed(_))));
        assert!(handle.next_event().await.is_none());
    }

    /// 本地起一个只会返回 503 的 TTS 服务
    async fn failing_service() -> String {
        use axum::{http::StatusCode, routing::post, Router};

        let router = Router::new().route(
            "/api/tts/stream",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "voice not loaded") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_error_status_fails_stream() {
        let base_url = failing_service().await;
        let client = HttpSpeechClient::new(HttpSpeechClientConfig::new(base_url)).unwrap();

        let mut handle = client
            .synthesize(SynthesisRequest::new("Hello.", "en-US-AvaNeural", 1.0))
            .await
            .unwrap();

        match handle.next_event().await {
            Some(StreamEvent::Failed(reason)) => {
                assert!(reason.starts_with("Service error: HTTP 503"), "{}", reason);
                assert!(reason.contains("voice not loaded"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let client = HttpSpeechClient::new(HttpSpeechClientConfig::default()).unwrap();
        let err = client
            .synthesize(SynthesisRequest::new("   ", "en-US-AvaNeural", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidRequest(_)));
    }
}
