//! Reading Context - Errors

use thiserror::Error;

/// 朗读会话错误
///
/// 流水线内部错误（合成、解码、设备）对当前会话是致命的，
/// 由控制器转换为一次完整停止加一次错误通知
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadingError {
    #[error("No readable sentences found")]
    SegmentationEmpty,

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Audio decode failed: {0}")]
    DecodeFailed(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Sentence index {index} out of range (total: {total})")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("Reader not reachable: {0}")]
    TransportUnreachable(String),

    #[error("No active reading session")]
    NoSession,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ReadingError {
    /// 错误类别名（用于日志和响应）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SegmentationEmpty => "SegmentationEmpty",
            Self::SynthesisFailed(_) => "SynthesisFailed",
            Self::DecodeFailed(_) => "DecodeFailed",
            Self::DeviceUnavailable(_) => "DeviceUnavailable",
            Self::IndexOutOfRange { .. } => "IndexOutOfRange",
            Self::TransportUnreachable(_) => "TransportUnreachable",
            Self::NoSession => "NoSession",
            Self::InvalidArgument(_) => "InvalidArgument",
        }
    }
}
