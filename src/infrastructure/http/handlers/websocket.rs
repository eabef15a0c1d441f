//! WebSocket Handler
//!
//! 阅读页连接：接收请求信封并回复，同时转发所有出站事件

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::application::ReaderResponse;
use crate::infrastructure::http::dto::{WsRequestEnvelope, WsResponseEnvelope};
use crate::infrastructure::http::state::AppState;

/// 阅读页 WebSocket 连接处理
pub async fn reader_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_reader_socket(socket, state))
}

async fn handle_reader_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // 先订阅，保证 openReader 重试期间能看到本连接
    let mut event_rx = state.event_publisher.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    tracing::info!("Reader WebSocket connected");

    // 事件与回复转发任务
    let mut forward_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                event = event_rx.recv() => match event {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Reader WebSocket lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(json) => json,
                    None => break,
                },
            };

            if let Err(e) = sender.send(Message::Text(text)).await {
                tracing::debug!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    // 接收请求（按到达顺序逐个分发）
    let transport = state.transport.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let reply = match serde_json::from_str::<WsRequestEnvelope>(&text) {
                        Ok(envelope) => WsResponseEnvelope {
                            id: envelope.id,
                            response: transport.dispatch(envelope.request).await,
                        },
                        Err(e) => {
                            tracing::debug!(error = %e, "Malformed reader request");
                            WsResponseEnvelope {
                                id: None,
                                response: ReaderResponse::error(format!("Malformed request: {}", e)),
                            }
                        }
                    };

                    match serde_json::to_string(&reply) {
                        Ok(json) => {
                            if reply_tx.send(json).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "Failed to serialize reply"),
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Reader WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Reader WebSocket error");
                    break;
                }
                _ => {
                    // Ping/Pong 由 axum 处理
                }
            }
        }
    });

    // 任一任务结束即断开，释放事件订阅
    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    }

    tracing::info!("Reader WebSocket disconnected");
}
