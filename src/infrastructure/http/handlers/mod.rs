//! HTTP Handlers

mod ping;
mod reader;
mod settings;
mod websocket;

pub use ping::*;
pub use reader::*;
pub use settings::*;
pub use websocket::*;
