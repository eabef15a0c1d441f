//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping              GET   健康检查
//! - /api/reader/command    POST  执行阅读页命令（与 WebSocket 载荷相同）
//! - /api/reader/state      GET   当前会话状态
//! - /api/settings          GET   读取朗读设置
//! - /api/settings          POST  保存朗读设置
//! - /ws/reader             WS    阅读页连接（请求信封 + 出站事件）

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/reader", get(handlers::reader_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/reader", reader_routes())
        .route(
            "/settings",
            get(handlers::get_settings).post(handlers::save_settings),
        )
}

/// Reader 路由
fn reader_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/command", post(handlers::reader_command))
        .route("/state", get(handlers::reader_state))
}
