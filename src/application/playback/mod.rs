//! Playback - 单句音频的解码与播放

mod engine;

pub use engine::{AudioPlaybackEngine, PlaybackOutcome};
