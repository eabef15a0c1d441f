//! HTTP Layer - RESTful API + WebSocket
//!
//! 阅读页通过 WebSocket 发送请求并接收事件；HTTP 接口提供同样的命令入口

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::AppState;
