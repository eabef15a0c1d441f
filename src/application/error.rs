//! 应用层错误定义
//!
//! 端口错误到朗读错误分类的转换，以及传输层之外的通用错误

use thiserror::Error;

use crate::application::ports::{AudioError, SettingsError, SynthesisError, TransportError};
use crate::domain::ReadingError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 朗读会话错误
    #[error(transparent)]
    Reading(#[from] ReadingError),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 设置存储错误
    #[error("Settings error: {0}")]
    SettingsError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<SettingsError> for ApplicationError {
    fn from(err: SettingsError) -> Self {
        Self::SettingsError(err.to_string())
    }
}

impl From<SynthesisError> for ReadingError {
    fn from(err: SynthesisError) -> Self {
        Self::SynthesisFailed(err.to_string())
    }
}

impl From<AudioError> for ReadingError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Decode(msg) => Self::DecodeFailed(msg),
            AudioError::DeviceUnavailable(msg) => Self::DeviceUnavailable(msg),
            other => Self::DeviceUnavailable(other.to_string()),
        }
    }
}

impl From<TransportError> for ReadingError {
    fn from(err: TransportError) -> Self {
        Self::TransportUnreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_errors_map_to_reading_taxonomy() {
        let err: ReadingError = SynthesisError::Timeout.into();
        assert_eq!(err.kind(), "SynthesisFailed");

        let err: ReadingError = SynthesisError::NoAudio.into();
        assert_eq!(
            err,
            ReadingError::SynthesisFailed("No audio data produced".to_string())
        );

        let err: ReadingError = AudioError::Decode("bad header".to_string()).into();
        assert_eq!(err, ReadingError::DecodeFailed("bad header".to_string()));

        let err: ReadingError = AudioError::Playback("underrun".to_string()).into();
        assert_eq!(err.kind(), "DeviceUnavailable");

        let err: ReadingError = TransportError::RetriesExhausted { attempts: 15 }.into();
        assert_eq!(err.kind(), "TransportUnreachable");
    }
}
