//! 周期时长计算
//!
//! 回调收到的时长来自机器人时钟的相邻差值，而不是主机墙钟。
//! 第一个周期没有前一个时间戳，使用标称控制周期。

use fci_driver::DriverError;
use std::time::Duration;

pub(crate) struct CycleClock {
    nominal: Duration,
    previous: Option<Duration>,
    elapsed: Duration,
}

impl CycleClock {
    pub(crate) fn new(nominal: Duration) -> Self {
        Self {
            nominal,
            previous: None,
            elapsed: Duration::ZERO,
        }
    }

    /// 记录新状态的时间戳，返回距上一周期的时长（严格为正）
    pub(crate) fn tick(&mut self, time: Duration) -> Result<Duration, DriverError> {
        let period = match self.previous {
            None => self.nominal,
            Some(previous) if time > previous => time - previous,
            Some(previous) => {
                return Err(DriverError::NonMonotonicTime {
                    previous,
                    current: time,
                });
            },
        };
        self.previous = Some(time);
        self.elapsed += period;
        Ok(period)
    }

    /// 会话开始以来的累计时长
    pub(crate) fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
