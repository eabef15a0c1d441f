//! Data Transfer Objects

use serde::{Deserialize, Serialize};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Settings DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveSettingsRequest {
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
}

// ============================================================================
// WebSocket DTOs
// ============================================================================

/// 阅读页经 WebSocket 发来的请求信封
#[derive(Debug, Deserialize)]
pub struct WsRequestEnvelope {
    /// 客户端关联 ID，原样带回
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub request: crate::application::ReaderRequest,
}

/// 请求信封的回复
#[derive(Debug, Serialize)]
pub struct WsResponseEnvelope {
    pub id: Option<serde_json::Value>,
    pub response: crate::application::ReaderResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ReaderRequest, ReaderResponse};
    use serde_json::json;

    #[test]
    fn test_ws_envelope_roundtrip_shape() {
        let envelope: WsRequestEnvelope = serde_json::from_value(json!({
            "id": 7,
            "request": {"action": "readFromIndex", "index": 2}
        }))
        .unwrap();
        assert_eq!(envelope.id, Some(json!(7)));
        assert!(matches!(envelope.request, ReaderRequest::ReadFromIndex { index: 2 }));

        let reply = WsResponseEnvelope {
            id: envelope.id,
            response: ReaderResponse::success(),
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["response"]["status"], "success");
    }

    #[test]
    fn test_ws_envelope_without_id() {
        let envelope: WsRequestEnvelope =
            serde_json::from_value(json!({"request": {"action": "pauseReading"}})).unwrap();
        assert!(envelope.id.is_none());
        assert!(matches!(envelope.request, ReaderRequest::PauseReading));
    }
}
