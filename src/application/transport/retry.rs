//! Retry Policy - 打开阅读页时的有界重试

use std::time::Duration;

/// 默认重试次数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
/// 默认重试间隔
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(150);

/// 有界重试策略（固定间隔）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// 最坏情况下的总等待时间
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}
