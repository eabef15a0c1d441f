//! Reading Session Controller
//!
//! 朗读会话的核心状态机：分句 → 逐句合成 → 解码播放 → 前进，
//! 并对外提供 seek / pause / resume / stop 操作。
//!
//! 并发模型:
//! - 控制操作由 `control` 互斥锁串行化
//! - 逐句流水线是一个独立的 tokio 任务，每次 start/seek/resume 新建一个
//! - 每个流水线任务绑定一个 generation；控制操作递增 generation 后，
//!   旧任务在下一个检查点发现自己已过期并退出，不再产生任何事件

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::playback::{AudioPlaybackEngine, PlaybackOutcome};
use crate::application::ports::{
    ReaderEvent, ReaderEventPort, ReaderSettings, SettingsStorePort, SpeechSynthesizerPort,
    StreamEvent, SynthesisError, SynthesisRequest,
};
use crate::domain::reading::{Guard, MAX_RATE, MIN_RATE};
use crate::domain::{
    segment, ReadingError, ReadingPhase, SegmentConfig, SentenceUnit, SessionSnapshot,
    SessionState,
};

/// 默认句间停顿
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(200);

/// 控制器配置
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// 句间停顿（可被 pause/seek/stop 取消）
    pub pacing_delay: Duration,
    /// 分句配置
    pub segment: SegmentConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pacing_delay: DEFAULT_PACING_DELAY,
            segment: SegmentConfig::default(),
        }
    }
}

struct Pipeline {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    state: SessionState,
    phase: ReadingPhase,
    generation: u64,
    pipeline: Option<Pipeline>,
}

/// 单句处理结果
enum SentenceOutcome {
    Played,
    /// 被 pause/seek/stop 取代
    Superseded,
}

/// 控制器与流水线任务共享的部分
struct Shared {
    synthesizer: Arc<dyn SpeechSynthesizerPort>,
    engine: Arc<AudioPlaybackEngine>,
    events: Arc<dyn ReaderEventPort>,
    pacing_delay: Duration,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 投递事件；显示端不可达不影响朗读
    fn emit(&self, event: ReaderEvent) {
        let name = event.name();
        if let Err(e) = self.events.publish(event) {
            tracing::debug!(event = name, error = %e, "Reader event not delivered");
        }
    }

    /// 逐句驱动循环
    async fn drive(self: Arc<Self>, generation: u64, token: CancellationToken) {
        loop {
            // 1. 守卫检查 + 2. 高亮（先于音频）
            let (sentence, voice, rate) = {
                let mut inner = self.lock();
                if inner.generation != generation {
                    return;
                }
                match inner.state.guard() {
                    Guard::Halted => return,
                    Guard::Finished => {
                        self.finish(&mut inner);
                        return;
                    }
                    Guard::Continue(sentence) => {
                        inner.phase = ReadingPhase::Loading;
                        self.emit(ReaderEvent::UpdateReaderHighlight {
                            index: sentence.index,
                            text: sentence.text.clone(),
                        });
                        (
                            sentence,
                            inner.state.voice().to_string(),
                            inner.state.rate(),
                        )
                    }
                }
            };

            tracing::debug!(
                generation = generation,
                index = sentence.index,
                text_len = sentence.text.len(),
                "Reading sentence"
            );

            // 3. 合成 → 解码 → 播放
            match self
                .read_sentence(&sentence, voice, rate, generation, &token)
                .await
            {
                Ok(SentenceOutcome::Played) => {}
                Ok(SentenceOutcome::Superseded) => {
                    tracing::debug!(index = sentence.index, "Sentence superseded");
                    return;
                }
                Err(e) => {
                    self.fail(generation, sentence.index, e);
                    return;
                }
            }

            // 4. 句间停顿后再次检查并前进
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(self.pacing_delay) => {}
            }

            {
                let mut inner = self.lock();
                if inner.generation != generation
                    || inner.state.is_paused()
                    || !inner.state.is_playing()
                {
                    return;
                }
                inner.state.advance();
            }
        }
    }

    async fn read_sentence(
        &self,
        sentence: &SentenceUnit,
        voice: String,
        rate: f32,
        generation: u64,
        token: &CancellationToken,
    ) -> Result<SentenceOutcome, ReadingError> {
        let request = SynthesisRequest::new(sentence.text.clone(), voice, rate);

        let mut stream = tokio::select! {
            _ = token.cancelled() => return Ok(SentenceOutcome::Superseded),
            res = self.synthesizer.synthesize(request) => res?,
        };

        let mut chunks = Vec::new();
        loop {
            let event = tokio::select! {
                _ = token.cancelled() => {
                    stream.detach();
                    return Ok(SentenceOutcome::Superseded);
                }
                event = stream.next_event() => event,
            };

            match event {
                Some(StreamEvent::Chunk(data)) => chunks.push(data),
                Some(StreamEvent::Complete) => break,
                Some(StreamEvent::Failed(reason)) => {
                    return Err(ReadingError::SynthesisFailed(reason));
                }
                None => {
                    return Err(ReadingError::SynthesisFailed(
                        "synthesis stream closed".to_string(),
                    ));
                }
            }
        }
        drop(stream);

        if chunks.is_empty() {
            return Err(SynthesisError::NoAudio.into());
        }

        // 启动播放节点之前最后一次检查
        {
            let mut inner = self.lock();
            if inner.generation != generation
                || token.is_cancelled()
                || inner.state.is_paused()
                || !inner.state.is_playing()
            {
                return Ok(SentenceOutcome::Superseded);
            }
            inner.phase = ReadingPhase::Playing;
        }

        let outcome = tokio::select! {
            _ = token.cancelled() => return Ok(SentenceOutcome::Superseded),
            res = self.engine.play_encoded_audio(&chunks) => res?,
        };

        Ok(match outcome {
            PlaybackOutcome::Completed => SentenceOutcome::Played,
            PlaybackOutcome::Stopped => SentenceOutcome::Superseded,
        })
    }

    /// 正常读完：进入 Finished，完整停止并通知一次
    fn finish(&self, inner: &mut Inner) {
        let total = inner.state.len();
        let elapsed = Utc::now() - inner.state.started_at();
        inner.generation += 1;
        inner.pipeline = None;
        inner.state.clear();
        inner.phase = ReadingPhase::Finished;
        self.engine.close();

        tracing::info!(
            session_id = %inner.state.id(),
            total = total,
            elapsed_ms = elapsed.num_milliseconds(),
            "Reading finished"
        );
        self.emit(ReaderEvent::ReadingStopped {
            close_reader: false,
        });
    }

    /// 流水线错误：对会话致命，完整停止并通知显示端关闭
    fn fail(&self, generation: u64, index: usize, error: ReadingError) {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(error = %error, "Ignoring error from superseded pipeline");
            return;
        }

        tracing::error!(
            session_id = %inner.state.id(),
            index = index,
            kind = error.kind(),
            error = %error,
            "Reading pipeline failed, stopping session"
        );

        inner.generation += 1;
        inner.pipeline = None;
        inner.state.clear();
        inner.phase = ReadingPhase::Idle;
        self.engine.close();

        self.emit(ReaderEvent::Error {
            message: error.to_string(),
        });
        self.emit(ReaderEvent::ReadingStopped { close_reader: true });
    }
}

/// 朗读会话控制器
///
/// 每个页面上下文一个实例，同一时间只有一个会话
pub struct ReadingSessionController {
    shared: Arc<Shared>,
    settings: Arc<dyn SettingsStorePort>,
    segment_config: SegmentConfig,
    control: tokio::sync::Mutex<()>,
}

impl ReadingSessionController {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizerPort>,
        engine: Arc<AudioPlaybackEngine>,
        events: Arc<dyn ReaderEventPort>,
        settings: Arc<dyn SettingsStorePort>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                synthesizer,
                engine,
                events,
                pacing_delay: config.pacing_delay,
                inner: Mutex::new(Inner {
                    state: SessionState::default(),
                    phase: ReadingPhase::Idle,
                    generation: 0,
                    pipeline: None,
                }),
            }),
            settings,
            segment_config: config.segment,
            control: tokio::sync::Mutex::new(()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 当前阶段
    pub fn phase(&self) -> ReadingPhase {
        self.shared.lock().phase
    }

    /// 会话状态快照
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.lock();
        inner.state.snapshot(inner.phase)
    }

    /// 从头开始朗读
    pub async fn start(
        &self,
        text: &str,
        voice: Option<String>,
        rate: Option<f32>,
    ) -> Result<SessionSnapshot, ReadingError> {
        self.start_from(text, voice, rate, 0).await
    }

    /// 开始新会话并从指定句子朗读
    ///
    /// 旧会话先被完整停止；文本分句为空时返回 `SegmentationEmpty`
    pub async fn start_from(
        &self,
        text: &str,
        voice: Option<String>,
        rate: Option<f32>,
        start_index: usize,
    ) -> Result<SessionSnapshot, ReadingError> {
        let _control = self.control.lock().await;

        let (sentences, voice, rate) = self.prepare_start(text, voice, rate, start_index).await?;

        // 单会话：先拆除旧会话
        self.halt_pipeline().await;
        {
            let mut inner = self.shared.lock();
            inner.state.clear();
            inner.phase = ReadingPhase::Idle;
        }
        self.shared.engine.close();

        if sentences.is_empty() {
            tracing::info!(text_len = text.len(), "Nothing to read");
            return Err(ReadingError::SegmentationEmpty);
        }

        let snapshot = {
            let mut inner = self.shared.lock();
            inner.state = SessionState::new(sentences, voice, rate);
            inner.state.seek(start_index)?;
            inner.state.play();
            inner.phase = ReadingPhase::Loading;

            tracing::info!(
                session_id = %inner.state.id(),
                sentences = inner.state.len(),
                start_index = start_index,
                voice = %inner.state.voice(),
                rate = inner.state.rate(),
                "Reading session started"
            );
            self.spawn_pipeline(&mut inner);
            inner.state.snapshot(inner.phase)
        };

        Ok(snapshot)
    }

    /// 预检一次启动请求，不触碰当前会话
    ///
    /// 起始索引越界或语速非法时返回与 `start_from` 相同的错误
    pub async fn validate_start(
        &self,
        text: &str,
        voice: Option<String>,
        rate: Option<f32>,
        start_index: usize,
    ) -> Result<(), ReadingError> {
        self.prepare_start(text, voice, rate, start_index)
            .await
            .map(|_| ())
    }

    /// 分句、检查起始索引并解析音色与语速
    async fn prepare_start(
        &self,
        text: &str,
        voice: Option<String>,
        rate: Option<f32>,
        start_index: usize,
    ) -> Result<(Vec<SentenceUnit>, String, f32), ReadingError> {
        let sentences = segment(text, &self.segment_config);
        if !sentences.is_empty() && start_index >= sentences.len() {
            return Err(ReadingError::IndexOutOfRange {
                index: start_index,
                total: sentences.len(),
            });
        }
        let (voice, rate) = self.resolve_voice(voice, rate).await?;
        Ok((sentences, voice, rate))
    }

    /// 跳转到指定句子（seek）
    ///
    /// 强制拆除在途资源，保留句子列表后从该句重新开始
    pub async fn read_from_index(&self, index: usize) -> Result<SessionSnapshot, ReadingError> {
        let _control = self.control.lock().await;

        {
            let inner = self.shared.lock();
            let total = inner.state.len();
            if index >= total {
                return Err(ReadingError::IndexOutOfRange { index, total });
            }
        }

        // stop(keepSentences = true)
        self.halt_pipeline().await;

        let mut inner = self.shared.lock();
        inner.state.seek(index)?;
        if !inner.state.has_voice() {
            let defaults = ReaderSettings::default();
            inner.state.set_voice(defaults.voice, defaults.speed);
        }
        inner.state.play();
        inner.phase = ReadingPhase::Loading;

        tracing::info!(session_id = %inner.state.id(), index = index, "Seek");
        self.spawn_pipeline(&mut inner);
        Ok(inner.state.snapshot(inner.phase))
    }

    /// 暂停（句子粒度：恢复后从当前句开头重读）
    pub async fn pause(&self) -> Result<SessionSnapshot, ReadingError> {
        let _control = self.control.lock().await;

        {
            let mut inner = self.shared.lock();
            if !inner.state.is_playing() {
                tracing::debug!(phase = inner.phase.as_str(), "Pause ignored, not playing");
                return Ok(inner.state.snapshot(inner.phase));
            }
            inner.state.pause();
            inner.phase = ReadingPhase::Paused;
        }

        self.halt_pipeline().await;

        let inner = self.shared.lock();
        tracing::info!(
            session_id = %inner.state.id(),
            index = inner.state.current_index(),
            "Reading paused"
        );
        Ok(inner.state.snapshot(inner.phase))
    }

    /// 恢复（从当前索引重新合成）
    pub async fn resume(&self) -> Result<SessionSnapshot, ReadingError> {
        let _control = self.control.lock().await;

        let needs_voice = {
            let inner = self.shared.lock();
            if inner.state.is_empty() {
                return Err(ReadingError::NoSession);
            }
            if inner.state.is_playing() && inner.pipeline.is_some() {
                return Ok(inner.state.snapshot(inner.phase));
            }
            !inner.state.has_voice()
        };

        let resolved = if needs_voice {
            Some(self.resolve_voice(None, None).await?)
        } else {
            None
        };

        self.halt_pipeline().await;

        let mut inner = self.shared.lock();
        if let Some((voice, rate)) = resolved {
            inner.state.set_voice(voice, rate);
        }
        inner.state.play();
        inner.phase = ReadingPhase::Loading;

        tracing::info!(
            session_id = %inner.state.id(),
            index = inner.state.current_index(),
            "Reading resumed"
        );
        self.spawn_pipeline(&mut inner);
        Ok(inner.state.snapshot(inner.phase))
    }

    /// 停止朗读
    ///
    /// `keep_sentences` 为 false 时结束会话（清空句子、释放输出上下文）；
    /// 返回停止前是否有活动会话。空闲时为空操作。
    pub async fn stop(&self, keep_sentences: bool) -> Result<bool, ReadingError> {
        let _control = self.control.lock().await;

        let was_active = {
            let inner = self.shared.lock();
            inner.state.is_playing() || inner.state.is_paused() || inner.pipeline.is_some()
        };

        self.halt_pipeline().await;

        {
            let mut inner = self.shared.lock();
            inner.state.halt();
            if !keep_sentences {
                inner.state.clear();
            }
            if was_active || !keep_sentences {
                inner.phase = ReadingPhase::Idle;
            }
        }
        if !keep_sentences {
            self.shared.engine.close();
        }

        if was_active {
            tracing::info!(keep_sentences = keep_sentences, "Reading stopped");
        }
        Ok(was_active)
    }

    /// 进程退出前释放资源
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop(false).await {
            tracing::warn!(error = %e, "Controller shutdown failed");
        }
    }

    /// 解析音色与语速：显式参数优先，其次读取持久化设置
    async fn resolve_voice(
        &self,
        voice: Option<String>,
        rate: Option<f32>,
    ) -> Result<(String, f32), ReadingError> {
        let voice = voice.filter(|v| !v.trim().is_empty());

        let (voice, rate) = match (voice, rate) {
            (Some(voice), Some(rate)) => (voice, rate),
            (voice, rate) => {
                let saved = match self.settings.get_settings().await {
                    Ok(settings) => settings,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to load settings, using defaults");
                        ReaderSettings::default()
                    }
                };
                (voice.unwrap_or(saved.voice), rate.unwrap_or(saved.speed))
            }
        };

        if !rate.is_finite() || !(MIN_RATE..=MAX_RATE).contains(&rate) {
            return Err(ReadingError::InvalidArgument(format!(
                "rate {} outside {}..={}",
                rate, MIN_RATE, MAX_RATE
            )));
        }

        Ok((voice, rate))
    }

    /// 启动新的流水线任务（调用方持有 inner 锁）
    fn spawn_pipeline(&self, inner: &mut Inner) {
        let token = CancellationToken::new();
        let handle = tokio::spawn(
            self.shared
                .clone()
                .drive(inner.generation, token.clone()),
        );
        inner.pipeline = Some(Pipeline { token, handle });
    }

    /// 使当前流水线失效、释放在途流与播放节点，并等待任务退出
    ///
    /// 保留句子列表与索引
    async fn halt_pipeline(&self) -> bool {
        let pipeline = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.pipeline.take()
        };

        let Some(pipeline) = pipeline else {
            self.shared.engine.stop();
            return false;
        };

        pipeline.token.cancel();
        self.shared.engine.stop();

        if let Err(e) = pipeline.handle.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Reading pipeline task panicked");
            }
        }
        true
    }
}
