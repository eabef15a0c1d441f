//! Reading - 朗读会话控制

mod controller;

pub use controller::{ControllerConfig, ReadingSessionController, DEFAULT_PACING_DELAY};
