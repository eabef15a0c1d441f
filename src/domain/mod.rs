//! Domain Layer - 领域层
//!
//! 包含:
//! - Reading Context: 朗读会话状态与错误
//! - 文章值对象与文本分句器

mod article;
pub mod reading;
mod text_segmenter;

pub use article::{Article, ArticleMetadata};
pub use reading::{ReadingError, ReadingPhase, SessionSnapshot, SessionState};
pub use text_segmenter::{
    is_heading, normalize_whitespace, segment, segment_default, SegmentConfig, SentenceUnit,
};
