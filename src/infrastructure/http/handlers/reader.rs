//! Reader Handlers - 阅读控制命令

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{ReaderRequest, ReaderResponse};
use crate::domain::SessionSnapshot;
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::state::AppState;

/// 执行一个阅读页命令
///
/// 与 WebSocket 请求使用同一套载荷，响应为 `{status, error?, data?}`
pub async fn reader_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReaderRequest>,
) -> Json<ReaderResponse> {
    Json(state.transport.dispatch(req).await)
}

/// 当前会话状态
pub async fn reader_state(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<SessionSnapshot>> {
    Json(ApiResponse::success(state.transport.controller().snapshot()))
}
