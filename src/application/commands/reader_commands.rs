//! Reader Commands - 阅读页发来的请求及其响应
//!
//! 线上格式: `{"action": "startReading", "voice": "...", "speed": 1.0}`
//! 响应: `{"status": "success"}` 或 `{"status": "error", "error": "..."}`

use serde::{Deserialize, Serialize};

use crate::domain::ArticleMetadata;

/// 入站请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ReaderRequest {
    /// 开始朗读；text 缺省时使用已加载的文章
    #[serde(rename_all = "camelCase")]
    StartReading {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_from_index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// 点击句子跳转
    ReadFromIndex { index: usize },

    PauseReading,

    ResumeReading,

    #[serde(rename_all = "camelCase")]
    StopReading {
        #[serde(default)]
        close_reader: bool,
    },

    /// 页面侧提交已提取的文章
    LoadArticle {
        title: String,
        content: String,
        #[serde(default)]
        metadata: ArticleMetadata,
    },

    GetState,

    GetSettings,

    SaveSettings {
        #[serde(default)]
        voice: Option<String>,
        #[serde(default)]
        speed: Option<f32>,
    },
}

impl ReaderRequest {
    /// 动作名（用于日志）
    pub fn action(&self) -> &'static str {
        match self {
            Self::StartReading { .. } => "startReading",
            Self::ReadFromIndex { .. } => "readFromIndex",
            Self::PauseReading => "pauseReading",
            Self::ResumeReading => "resumeReading",
            Self::StopReading { .. } => "stopReading",
            Self::LoadArticle { .. } => "loadArticle",
            Self::GetState => "getState",
            Self::GetSettings => "getSettings",
            Self::SaveSettings { .. } => "saveSettings",
        }
    }
}

/// 响应状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// 请求响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ReaderResponse {
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            error: None,
            data: None,
        }
    }

    pub fn success_with(data: serde_json::Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            error: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            error: Some(message.into()),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_requests() {
        let req: ReaderRequest = serde_json::from_value(json!({
            "action": "startReading",
            "voice": "en-US-AvaNeural",
            "speed": 1.25,
            "startFromIndex": 2
        }))
        .unwrap();
        assert_eq!(
            req,
            ReaderRequest::StartReading {
                voice: Some("en-US-AvaNeural".to_string()),
                speed: Some(1.25),
                start_from_index: Some(2),
                text: None,
            }
        );

        let req: ReaderRequest =
            serde_json::from_value(json!({"action": "startReading"})).unwrap();
        assert!(matches!(req, ReaderRequest::StartReading { voice: None, .. }));

        let req: ReaderRequest = serde_json::from_value(json!({"action": "pauseReading"})).unwrap();
        assert_eq!(req, ReaderRequest::PauseReading);

        let req: ReaderRequest =
            serde_json::from_value(json!({"action": "stopReading", "closeReader": true})).unwrap();
        assert_eq!(req, ReaderRequest::StopReading { close_reader: true });

        let req: ReaderRequest =
            serde_json::from_value(json!({"action": "readFromIndex", "index": 4})).unwrap();
        assert_eq!(req.action(), "readFromIndex");
    }

    #[test]
    fn test_unknown_action_rejected() {
        let res = serde_json::from_value::<ReaderRequest>(json!({"action": "selfDestruct"}));
        assert!(res.is_err());
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_value(ReaderResponse::success()).unwrap();
        assert_eq!(json, json!({"status": "success"}));

        let json = serde_json::to_value(ReaderResponse::error("boom")).unwrap();
        assert_eq!(json, json!({"status": "error", "error": "boom"}));
    }
}
