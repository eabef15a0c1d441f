//! Ping Handler
//!
//! 健康检查，附带 TTS 服务可用性和已连接阅读页数量

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::application::ports::ReaderEventPort;
use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tts: bool,
    pub readers: usize,
}

/// Ping endpoint - 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tts: state.synthesizer.health_check().await,
        readers: state.event_publisher.receiver_count(),
    })
}
