//! Reading Context - 朗读会话限界上下文
//!
//! 职责:
//! - 会话状态（句子列表、当前索引、音色、语速、播放/暂停标志）
//! - 会话阶段与错误分类

mod errors;
mod session_state;

pub use errors::ReadingError;
pub use session_state::{
    Guard, ReadingPhase, SessionSnapshot, SessionState, DEFAULT_RATE, DEFAULT_VOICE, MAX_RATE,
    MIN_RATE,
};
