//! 驱动配置
//!
//! 控制周期、接收超时与配置请求超时都在这里集中设置，
//! 控制循环本身不硬编码任何时间常量。

use crate::DriverError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 控制周期与抖动容差的上限（1 s）
pub const MAX_CYCLE_US: u64 = 1_000_000;

/// 驱动配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 控制器的标称控制周期（微秒）
    ///
    /// 会话第一个周期传给回调的时长即为该值。
    pub control_period_us: u64,
    /// 允许的周期抖动（微秒）
    ///
    /// 每周期接收超时 = 控制周期 + 抖动容差，超时视为通信故障。
    pub jitter_tolerance_us: u64,
    /// 配置请求的响应超时（毫秒）
    pub request_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            control_period_us: 1_000,
            jitter_tolerance_us: 1_000,
            request_timeout_ms: 5_000,
        }
    }
}

impl DriverConfig {
    pub fn with_control_period(mut self, period: Duration) -> Self {
        self.control_period_us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_jitter_tolerance(mut self, jitter: Duration) -> Self {
        self.jitter_tolerance_us = u64::try_from(jitter.as_micros()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn control_period(&self) -> Duration {
        Duration::from_micros(self.control_period_us)
    }

    /// 每周期接收超时
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_micros(self.control_period_us.saturating_add(self.jitter_tolerance_us))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 检查配置合法性
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.control_period_us == 0 {
            return Err(DriverError::InvalidConfig(
                "control_period_us must be > 0".to_string(),
            ));
        }
        if self.control_period_us > MAX_CYCLE_US {
            return Err(DriverError::InvalidConfig(format!(
                "control_period_us must be <= {}, got {}",
                MAX_CYCLE_US, self.control_period_us
            )));
        }
        if self.jitter_tolerance_us > MAX_CYCLE_US {
            return Err(DriverError::InvalidConfig(format!(
                "jitter_tolerance_us must be <= {}, got {}",
                MAX_CYCLE_US, self.jitter_tolerance_us
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
