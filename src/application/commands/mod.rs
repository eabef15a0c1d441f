//! 应用层 - 命令
//!
//! 显示端与控制器之间的请求/响应载荷

mod reader_commands;

pub use reader_commands::*;
