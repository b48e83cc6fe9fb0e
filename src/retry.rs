//! 重新订阅的退避策略

use std::time::Duration;

/// 指数退避
///
/// 第 n 次等待 `base * 2^n`，上限为 `max_delay`。订阅成功后调用 `reset`。
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    attempt: usize,
}

impl ExponentialBackoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            attempt: 0,
        }
    }

    /// 计算第 `attempt` 次的等待时间
    pub fn backoff_duration(&self, attempt: usize) -> Duration {
        let delay_ms = self.base_delay.as_millis() as u64 * (1 << attempt.min(10));
        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    /// 返回本次等待时间并推进计数
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.backoff_duration(self.attempt);
        self.attempt += 1;
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
