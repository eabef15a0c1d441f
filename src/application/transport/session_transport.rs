//! Session Transport - 请求分发与出站事件中继
//!
//! 将阅读页的请求分发给控制器，并负责打开阅读页（有界重试）

use serde_json::json;
use std::sync::Arc;

use super::{PageContext, RetryPolicy};
use crate::application::commands::{ReaderRequest, ReaderResponse};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ReaderEvent, ReaderEventPort, ReaderSettings, SettingsStorePort, TransportError,
};
use crate::application::reading::ReadingSessionController;
use crate::domain::reading::{MAX_RATE, MIN_RATE};
use crate::domain::{Article, ArticleMetadata, ReadingError};

type DispatchResult = Result<Option<serde_json::Value>, ApplicationError>;

/// 会话传输层
pub struct SessionTransport {
    controller: Arc<ReadingSessionController>,
    events: Arc<dyn ReaderEventPort>,
    settings: Arc<dyn SettingsStorePort>,
    page: PageContext,
    retry: RetryPolicy,
}

impl SessionTransport {
    pub fn new(
        controller: Arc<ReadingSessionController>,
        events: Arc<dyn ReaderEventPort>,
        settings: Arc<dyn SettingsStorePort>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            controller,
            events,
            settings,
            page: PageContext::new(),
            retry,
        }
    }

    pub fn controller(&self) -> &Arc<ReadingSessionController> {
        &self.controller
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// 分发一个请求；错误统一转换为 `{status: "error", error}`
    pub async fn dispatch(&self, request: ReaderRequest) -> ReaderResponse {
        let action = request.action();
        tracing::debug!(action = action, "Dispatching reader request");

        let result = match request {
            ReaderRequest::StartReading {
                voice,
                speed,
                start_from_index,
                text,
            } => self.start_reading(voice, speed, start_from_index, text).await,
            ReaderRequest::ReadFromIndex { index } => self.read_from_index(index).await,
            ReaderRequest::PauseReading => self.pause_reading().await,
            ReaderRequest::ResumeReading => self.resume_reading().await,
            ReaderRequest::StopReading { close_reader } => self.stop_reading(close_reader).await,
            ReaderRequest::LoadArticle {
                title,
                content,
                metadata,
            } => self.load_article(title, content, metadata).await,
            ReaderRequest::GetState => self.get_state(),
            ReaderRequest::GetSettings => self.get_settings().await,
            ReaderRequest::SaveSettings { voice, speed } => self.save_settings(voice, speed).await,
        };

        match result {
            Ok(Some(data)) => ReaderResponse::success_with(data),
            Ok(None) => ReaderResponse::success(),
            Err(e) => {
                tracing::warn!(action = action, error = %e, "Reader request failed");
                ReaderResponse::error(e.to_string())
            }
        }
    }

    async fn start_reading(
        &self,
        voice: Option<String>,
        speed: Option<f32>,
        start_from_index: Option<usize>,
        text: Option<String>,
    ) -> DispatchResult {
        let article = match text {
            Some(text) if !text.trim().is_empty() => {
                let title = self
                    .page
                    .article()
                    .await
                    .map(|a| a.title)
                    .unwrap_or_default();
                Article::new(title, text)
            }
            _ => self
                .page
                .article()
                .await
                .ok_or_else(|| ApplicationError::validation("No article loaded"))?,
        };

        if article.is_blank() {
            return Err(ReadingError::SegmentationEmpty.into());
        }

        // 显示端切换到新文章之前先拒绝非法请求，旧会话保持不变
        let start_index = start_from_index.unwrap_or(0);
        self.controller
            .validate_start(&article.content, voice.clone(), speed, start_index)
            .await?;

        self.open_reader(ReaderEvent::OpenReader {
            text: article.content.clone(),
            title: article.title.clone(),
            metadata: article.metadata.clone(),
        })
        .await
        .map_err(ReadingError::from)?;

        let snapshot = self
            .controller
            .start_from(&article.content, voice, speed, start_index)
            .await?;

        Ok(Some(json!({
            "sessionId": snapshot.session_id,
            "total": snapshot.total,
            "currentIndex": snapshot.current_index,
        })))
    }

    async fn read_from_index(&self, index: usize) -> DispatchResult {
        self.controller.read_from_index(index).await?;
        Ok(None)
    }

    async fn pause_reading(&self) -> DispatchResult {
        self.controller.pause().await?;
        Ok(None)
    }

    async fn resume_reading(&self) -> DispatchResult {
        self.controller.resume().await?;
        Ok(None)
    }

    async fn stop_reading(&self, close_reader: bool) -> DispatchResult {
        let was_active = self.controller.stop(false).await?;
        if was_active {
            if let Err(e) = self.events.publish(ReaderEvent::ReadingStopped { close_reader }) {
                tracing::debug!(error = %e, "readingStopped not delivered");
            }
        }
        Ok(None)
    }

    async fn load_article(
        &self,
        title: String,
        content: String,
        metadata: ArticleMetadata,
    ) -> DispatchResult {
        let article = Article::new(title, content).with_metadata(metadata);
        if article.is_blank() {
            return Err(ApplicationError::validation("Article content is empty"));
        }

        if self.events.receiver_count() > 0 {
            let event = ReaderEvent::UpdateContent {
                content: article.content.clone(),
                title: article.title.clone(),
                metadata: article.metadata.clone(),
            };
            if let Err(e) = self.events.publish(event) {
                tracing::debug!(error = %e, "updateContent not delivered");
            }
        }

        self.page.load(article).await;
        Ok(None)
    }

    fn get_state(&self) -> DispatchResult {
        let snapshot = self.controller.snapshot();
        let data = serde_json::to_value(snapshot)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;
        Ok(Some(data))
    }

    async fn get_settings(&self) -> DispatchResult {
        let settings = self.settings.get_settings().await?;
        let data = serde_json::to_value(settings)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;
        Ok(Some(data))
    }

    async fn save_settings(&self, voice: Option<String>, speed: Option<f32>) -> DispatchResult {
        let current = self.settings.get_settings().await?;
        let settings = ReaderSettings {
            voice: voice.unwrap_or(current.voice),
            speed: speed.unwrap_or(current.speed),
        };

        if settings.voice.trim().is_empty() {
            return Err(ApplicationError::validation("voice must not be empty"));
        }
        if !settings.speed.is_finite() || !(MIN_RATE..=MAX_RATE).contains(&settings.speed) {
            return Err(ApplicationError::validation(format!(
                "speed must be between {} and {}",
                MIN_RATE, MAX_RATE
            )));
        }

        self.settings.save_settings(&settings).await?;
        tracing::info!(voice = %settings.voice, speed = settings.speed, "Settings updated");

        let data = serde_json::to_value(settings)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;
        Ok(Some(data))
    }

    /// 打开阅读页：等待显示端连接后投递，超出重试预算则失败
    async fn open_reader(&self, event: ReaderEvent) -> Result<(), TransportError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            if self.events.receiver_count() > 0 {
                match self.events.publish(event.clone()) {
                    Ok(()) => {
                        tracing::debug!(attempt = attempt, "Reader opened");
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::debug!(attempt = attempt, error = %e, "openReader not delivered");
                    }
                }
            }

            if attempt >= self.retry.max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    waited_ms = self.retry.budget().as_millis() as u64,
                    "Reader unreachable, giving up"
                );
                return Err(TransportError::RetriesExhausted { attempts: attempt });
            }
            tokio::time::sleep(self.retry.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::playback::AudioPlaybackEngine;
    use crate::application::reading::ControllerConfig;
    use crate::domain::ReadingPhase;
    use crate::infrastructure::adapters::audio::{NullOutput, NullOutputConfig, SymphoniaDecoder};
    use crate::infrastructure::adapters::tts::{FakeSpeechClient, FakeSpeechClientConfig};
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::memory::InMemorySettingsStore;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn transport(audio_ms: u64) -> (SessionTransport, Arc<EventPublisher>, Arc<FakeSpeechClient>) {
        let publisher = Arc::new(EventPublisher::new());
        let settings = Arc::new(InMemorySettingsStore::new());
        let tts = Arc::new(FakeSpeechClient::new(FakeSpeechClientConfig {
            latency: Duration::from_millis(2),
            audio_ms,
            ..Default::default()
        }));
        let engine = Arc::new(AudioPlaybackEngine::new(
            Arc::new(SymphoniaDecoder::new()),
            Arc::new(NullOutput::new(NullOutputConfig::default())),
        ));
        let controller = Arc::new(ReadingSessionController::new(
            tts.clone(),
            engine,
            publisher.clone(),
            settings.clone(),
            ControllerConfig {
                pacing_delay: Duration::from_millis(5),
                ..Default::default()
            },
        ));
        let transport = SessionTransport::new(
            controller,
            publisher.clone(),
            settings,
            RetryPolicy::new(3, Duration::from_millis(5)),
        );
        (transport, publisher, tts)
    }

    async fn next_event(rx: &mut broadcast::Receiver<ReaderEvent>) -> ReaderEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event timeout")
            .expect("channel closed")
    }

    fn load(title: &str, content: &str) -> ReaderRequest {
        ReaderRequest::LoadArticle {
            title: title.to_string(),
            content: content.to_string(),
            metadata: ArticleMetadata::default(),
        }
    }

    fn start() -> ReaderRequest {
        ReaderRequest::StartReading {
            voice: None,
            speed: None,
            start_from_index: None,
            text: None,
        }
    }

    #[tokio::test]
    async fn test_start_opens_reader_then_highlights() {
        let (transport, publisher, _tts) = transport(3_000);
        let mut rx = publisher.subscribe();

        assert!(transport.dispatch(load("Title", "One. Two.")).await.is_success());
        assert_eq!(next_event(&mut rx).await.name(), "updateContent");

        let response = transport.dispatch(start()).await;
        assert!(response.is_success(), "{:?}", response);
        assert_eq!(response.data.unwrap()["total"], 2);

        match next_event(&mut rx).await {
            ReaderEvent::OpenReader { title, text, .. } => {
                assert_eq!(title, "Title");
                assert_eq!(text, "One. Two.");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(
            next_event(&mut rx).await,
            ReaderEvent::UpdateReaderHighlight {
                index: 0,
                text: "One.".to_string()
            }
        );

        let response = transport
            .dispatch(ReaderRequest::StopReading { close_reader: true })
            .await;
        assert!(response.is_success());
        assert_eq!(
            next_event(&mut rx).await,
            ReaderEvent::ReadingStopped { close_reader: true }
        );
    }

    #[tokio::test]
    async fn test_start_without_display_is_unreachable() {
        let (transport, _publisher, tts) = transport(30);
        transport.dispatch(load("Title", "One. Two.")).await;

        let response = transport.dispatch(start()).await;
        assert!(!response.is_success());
        assert!(response.error.unwrap().contains("Reader not reachable"));
        assert_eq!(transport.controller().phase(), ReadingPhase::Idle);
        assert!(tts.requests().is_empty());
    }

    #[tokio::test]
    async fn test_start_without_article() {
        let (transport, publisher, _tts) = transport(30);
        let _rx = publisher.subscribe();

        let response = transport.dispatch(start()).await;
        assert_eq!(response.error.as_deref(), Some("Validation error: No article loaded"));

        let response = transport
            .dispatch(ReaderRequest::StartReading {
                voice: None,
                speed: None,
                start_from_index: None,
                text: Some("   ".to_string()),
            })
            .await;
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_explicit_text_and_start_index() {
        let (transport, publisher, tts) = transport(3_000);
        let mut rx = publisher.subscribe();

        let response = transport
            .dispatch(ReaderRequest::StartReading {
                voice: Some("en-US-GuyNeural".to_string()),
                speed: Some(1.25),
                start_from_index: Some(1),
                text: Some("Alpha. Beta. Gamma.".to_string()),
            })
            .await;
        assert!(response.is_success(), "{:?}", response);

        assert_eq!(next_event(&mut rx).await.name(), "openReader");
        assert_eq!(
            next_event(&mut rx).await,
            ReaderEvent::UpdateReaderHighlight {
                index: 1,
                text: "Beta.".to_string()
            }
        );

        // 等待合成请求发出
        tokio::time::timeout(Duration::from_secs(5), async {
            while tts.requests().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let request = &tts.requests()[0];
        assert_eq!(request.voice, "en-US-GuyNeural");
        assert_eq!(request.rate, 1.25);

        let response = transport.dispatch(ReaderRequest::ReadFromIndex { index: 9 }).await;
        assert!(response.error.unwrap().contains("out of range"));

        transport
            .dispatch(ReaderRequest::StopReading { close_reader: false })
            .await;
    }

    #[tokio::test]
    async fn test_rejected_start_keeps_current_session() {
        let (transport, publisher, _tts) = transport(3_000);
        let mut rx = publisher.subscribe();

        let explicit = |text: &str, speed: Option<f32>, index: Option<usize>| {
            ReaderRequest::StartReading {
                voice: None,
                speed,
                start_from_index: index,
                text: Some(text.to_string()),
            }
        };

        let response = transport
            .dispatch(explicit("Old one. Old two.", None, None))
            .await;
        assert!(response.is_success(), "{:?}", response);
        assert_eq!(next_event(&mut rx).await.name(), "openReader");
        assert_eq!(next_event(&mut rx).await.name(), "updateReaderHighlight");

        let response = transport
            .dispatch(explicit("New one. New two.", None, Some(7)))
            .await;
        assert!(response.error.unwrap().contains("out of range"));

        let response = transport
            .dispatch(explicit("New one. New two.", Some(9.0), None))
            .await;
        assert!(response.error.unwrap().contains("Invalid argument"));

        // 显示端未被切换到新文章
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        let snapshot = transport.controller().snapshot();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.sentences[0].text, "Old one.");

        transport
            .dispatch(ReaderRequest::StopReading { close_reader: false })
            .await;
    }

    #[tokio::test]
    async fn test_control_actions_when_idle() {
        let (transport, publisher, _tts) = transport(30);
        let mut rx = publisher.subscribe();

        assert!(transport.dispatch(ReaderRequest::PauseReading).await.is_success());
        assert!(transport
            .dispatch(ReaderRequest::StopReading { close_reader: true })
            .await
            .is_success());

        let response = transport.dispatch(ReaderRequest::ResumeReading).await;
        assert_eq!(response.error.as_deref(), Some("No active reading session"));

        // 空闲时停止不产生事件
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_get_state() {
        let (transport, _publisher, _tts) = transport(30);
        let response = transport.dispatch(ReaderRequest::GetState).await;
        let data = response.data.unwrap();
        assert_eq!(data["phase"], "idle");
        assert_eq!(data["total"], 0);
    }

    #[tokio::test]
    async fn test_settings_roundtrip_and_validation() {
        let (transport, _publisher, _tts) = transport(30);

        let response = transport.dispatch(ReaderRequest::GetSettings).await;
        let data = response.data.unwrap();
        assert_eq!(data["voice"], "en-US-AvaNeural");
        assert_eq!(data["speed"], 1.0);

        let response = transport
            .dispatch(ReaderRequest::SaveSettings {
                voice: None,
                speed: Some(1.5),
            })
            .await;
        assert!(response.is_success());

        let data = transport
            .dispatch(ReaderRequest::GetSettings)
            .await
            .data
            .unwrap();
        assert_eq!(data["voice"], "en-US-AvaNeural");
        assert_eq!(data["speed"], 1.5);

        let response = transport
            .dispatch(ReaderRequest::SaveSettings {
                voice: None,
                speed: Some(9.0),
            })
            .await;
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_load_blank_article_rejected() {
        let (transport, _publisher, _tts) = transport(30);
        let response = transport.dispatch(load("Empty", "  ")).await;
        assert!(!response.is_success());
        assert!(transport.page().article().await.is_none());
    }
}
