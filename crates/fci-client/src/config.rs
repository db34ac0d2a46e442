//! 机器人连接配置
//!
//! 可以在代码中构造，也可以从 TOML 加载：
//!
//! ```toml
//! realtime = "ignore"
//! enforce_implied_mode = true
//!
//! [driver]
//! control_period_us = 1000
//! jitter_tolerance_us = 500
//! request_timeout_ms = 2000
//! ```

use crate::RobotError;
use fci_driver::{DriverConfig, RealtimeConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 机器人配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// 驱动（周期、超时）配置
    pub driver: DriverConfig,
    /// 实时调度策略
    pub realtime: RealtimeConfig,
    /// 纯力矩/力矩+运动会话是否监督隐含的控制器模式
    ///
    /// 开启时，会话第一个状态上报的模式被视为期望模式，之后任何变化都是控制故障。
    pub enforce_implied_mode: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            realtime: RealtimeConfig::default(),
            enforce_implied_mode: true,
        }
    }
}

impl RobotConfig {
    pub fn with_driver(mut self, driver: DriverConfig) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_realtime(mut self, realtime: RealtimeConfig) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_implied_mode_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_implied_mode = enforce;
        self
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, RobotError> {
        let config: RobotConfig = toml::from_str(content)
            .map_err(|e| RobotError::invalid_argument("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RobotError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RobotError::invalid_argument(
                "config",
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), RobotError> {
        self.driver.validate().map_err(RobotError::from)
    }
}
