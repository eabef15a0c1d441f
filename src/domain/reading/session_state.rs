//! Reading Context - Session State

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::ReadingError;
use crate::domain::SentenceUnit;

/// 默认音色
pub const DEFAULT_VOICE: &str = "en-US-AvaNeural";
/// 默认语速倍率
pub const DEFAULT_RATE: f32 = 1.0;
/// 允许的语速范围
pub const MIN_RATE: f32 = 0.25;
pub const MAX_RATE: f32 = 4.0;

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadingPhase {
    #[default]
    Idle,
    /// 正在合成/解码当前句子
    Loading,
    /// 当前句子音频正在播放
    Playing,
    Paused,
    Finished,
}

impl ReadingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

/// 流水线守卫检查结果
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    /// 可以继续处理该句
    Continue(SentenceUnit),
    /// 已暂停或未在播放
    Halted,
    /// 所有句子已读完
    Finished,
}

/// 会话状态
///
/// 不变量:
/// - `0 <= current_index <= sentences.len()`，等于长度表示已读完
/// - 稳定后 is_playing 与 is_paused 不同时为 true
#[derive(Debug, Clone)]
pub struct SessionState {
    id: String,
    sentences: Vec<SentenceUnit>,
    current_index: usize,
    voice: String,
    rate: f32,
    is_playing: bool,
    is_paused: bool,
    started_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Vec::new(), String::new(), DEFAULT_RATE)
    }
}

impl SessionState {
    /// 创建新会话（未开始播放）
    pub fn new(sentences: Vec<SentenceUnit>, voice: String, rate: f32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sentences,
            current_index: 0,
            voice,
            rate,
            is_playing: false,
            is_paused: false,
            started_at: Utc::now(),
        }
    }

    // Getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sentences(&self) -> &[SentenceUnit] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.sentences.len()
    }

    /// 是否已知音色
    pub fn has_voice(&self) -> bool {
        !self.voice.is_empty()
    }

    pub fn set_voice(&mut self, voice: String, rate: f32) {
        self.voice = voice;
        self.rate = rate;
    }

    /// 进入播放状态
    pub fn play(&mut self) {
        self.is_playing = true;
        self.is_paused = false;
    }

    /// 进入暂停状态（索引不变）
    pub fn pause(&mut self) {
        self.is_paused = true;
        self.is_playing = false;
    }

    /// 清除播放/暂停标志（保留句子）
    pub fn halt(&mut self) {
        self.is_playing = false;
        self.is_paused = false;
    }

    /// 丢弃句子列表并重置索引
    pub fn clear(&mut self) {
        self.halt();
        self.sentences.clear();
        self.current_index = 0;
    }

    /// 跳转到指定句子
    pub fn seek(&mut self, index: usize) -> Result<(), ReadingError> {
        if index >= self.sentences.len() {
            return Err(ReadingError::IndexOutOfRange {
                index,
                total: self.sentences.len(),
            });
        }
        self.current_index = index;
        Ok(())
    }

    /// 前进到下一句，索引最多到达长度
    pub fn advance(&mut self) {
        if self.current_index < self.sentences.len() {
            self.current_index += 1;
        }
    }

    /// 流水线守卫检查
    pub fn guard(&self) -> Guard {
        if self.is_paused || !self.is_playing {
            return Guard::Halted;
        }
        match self.sentences.get(self.current_index) {
            Some(sentence) => Guard::Continue(sentence.clone()),
            None => Guard::Finished,
        }
    }

    /// 状态快照
    pub fn snapshot(&self, phase: ReadingPhase) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            phase,
            current_index: self.current_index,
            total: self.sentences.len(),
            voice: self.voice.clone(),
            rate: self.rate,
            is_playing: self.is_playing,
            is_paused: self.is_paused,
            started_at: self.started_at,
            sentences: self.sentences.clone(),
        }
    }
}

/// 会话状态快照（对外只读视图）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: ReadingPhase,
    pub current_index: usize,
    pub total: usize,
    pub voice: String,
    pub rate: f32,
    pub is_playing: bool,
    pub is_paused: bool,
    pub started_at: DateTime<Utc>,
    pub sentences: Vec<SentenceUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment_default;

    fn state(text: &str) -> SessionState {
        SessionState::new(segment_default(text), DEFAULT_VOICE.to_string(), 1.0)
    }

    #[test]
    fn test_guard_transitions() {
        let mut s = state("One. Two.");
        assert_eq!(s.guard(), Guard::Halted);

        s.play();
        assert!(matches!(s.guard(), Guard::Continue(ref u) if u.index == 0));

        s.pause();
        assert!(s.is_paused() && !s.is_playing());
        assert_eq!(s.guard(), Guard::Halted);
        assert_eq!(s.current_index(), 0);

        s.play();
        s.advance();
        s.advance();
        assert!(s.is_finished());
        assert_eq!(s.guard(), Guard::Finished);

        // 索引不会越过长度
        s.advance();
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn test_seek_out_of_range_keeps_index() {
        let mut s = state("One. Two. Three.");
        s.seek(1).unwrap();
        let err = s.seek(5).unwrap_err();
        assert_eq!(err, ReadingError::IndexOutOfRange { index: 5, total: 3 });
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn test_clear_resets() {
        let mut s = state("One. Two.");
        s.play();
        s.advance();
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.current_index(), 0);
        assert!(!s.is_playing() && !s.is_paused());
    }
}
