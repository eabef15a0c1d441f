//! Transport - 控制器与显示端之间的消息边界

mod page_context;
mod retry;
mod session_transport;

pub use page_context::PageContext;
pub use retry::RetryPolicy;
pub use session_transport::SessionTransport;
