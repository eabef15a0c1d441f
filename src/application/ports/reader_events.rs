//! Reader Events Port - 控制器对显示端的出站事件
//!
//! 显示进程可能尚未连接或已关闭，投递失败以 `TransportError` 形式返回，不会阻塞

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ArticleMetadata;

/// 传输错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("No reader connected")]
    Unreachable,

    #[error("Reader did not respond after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// 出站事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ReaderEvent {
    /// 高亮当前句子（先于该句音频）
    #[serde(rename_all = "camelCase")]
    UpdateReaderHighlight { index: usize, text: String },

    /// 朗读已停止
    #[serde(rename_all = "camelCase")]
    ReadingStopped { close_reader: bool },

    /// 错误提示（显示端以自动消失的横幅展示）
    Error { message: String },

    /// 打开阅读页
    OpenReader {
        text: String,
        title: String,
        metadata: ArticleMetadata,
    },

    /// 更新阅读页内容
    UpdateContent {
        content: String,
        title: String,
        metadata: ArticleMetadata,
    },
}

impl ReaderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateReaderHighlight { .. } => "updateReaderHighlight",
            Self::ReadingStopped { .. } => "readingStopped",
            Self::Error { .. } => "error",
            Self::OpenReader { .. } => "openReader",
            Self::UpdateContent { .. } => "updateContent",
        }
    }
}

/// Reader Events Port
pub trait ReaderEventPort: Send + Sync {
    /// 投递事件；没有接收方时返回 `TransportError::Unreachable`
    fn publish(&self, event: ReaderEvent) -> Result<(), TransportError>;

    /// 当前已连接的显示端数量
    fn receiver_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = ReaderEvent::UpdateReaderHighlight {
            index: 3,
            text: "Hello.".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "updateReaderHighlight");
        assert_eq!(json["index"], 3);
        assert_eq!(json["text"], "Hello.");

        let json = serde_json::to_value(ReaderEvent::ReadingStopped { close_reader: true }).unwrap();
        assert_eq!(json["action"], "readingStopped");
        assert_eq!(json["closeReader"], true);
    }
}
