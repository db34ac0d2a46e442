//! 会话锁
//!
//! 同一个机器人句柄上任意时刻最多只有一个控制/读取会话（或配置请求）持有驱动。
//! 第二个尝试立即失败而不是等待，阻塞等待会破坏实时行为的确定性。
//!
//! [`Session`] 持有驱动的独占借用，离开作用域时（正常返回、提前返回、
//! 错误传播）恰好释放一次。

use crate::RobotError;
use fci_driver::{Driver, RobotMetrics};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// 会话类型（日志使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// 力矩控制（可附带运动生成器）
    Control,
    /// 运动生成器 + 控制器模式
    Motion,
    /// 读取循环
    Read,
    /// 单次读取
    ReadOnce,
    /// 配置命令
    Command,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Control => write!(f, "control"),
            SessionKind::Motion => write!(f, "motion"),
            SessionKind::Read => write!(f, "read"),
            SessionKind::ReadOnce => write!(f, "read-once"),
            SessionKind::Command => write!(f, "command"),
        }
    }
}

/// 非阻塞互斥门
pub struct SessionGuard {
    driver: Mutex<Driver>,
    metrics: Arc<RobotMetrics>,
}

impl SessionGuard {
    pub fn new(driver: Driver) -> Self {
        let metrics = driver.metrics().clone();
        Self {
            driver: Mutex::new(driver),
            metrics,
        }
    }

    /// 尝试获取独占会话
    ///
    /// 已被占用时立即返回 [`RobotError::SessionBusy`]，不产生任何副作用。
    pub fn try_acquire(&self, kind: SessionKind) -> Result<Session<'_>, RobotError> {
        match self.driver.try_lock() {
            Some(driver) => {
                self.metrics.sessions_started.fetch_add(1, Ordering::Relaxed);
                debug!("{} session acquired", kind);
                Ok(Session {
                    driver,
                    metrics: &self.metrics,
                    kind,
                })
            },
            None => {
                self.metrics.sessions_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Rejected {} session: another operation is running", kind);
                Err(RobotError::SessionBusy)
            },
        }
    }

    /// 当前是否有会话持有驱动
    pub fn is_held(&self) -> bool {
        self.driver.is_locked()
    }

    pub fn metrics(&self) -> &Arc<RobotMetrics> {
        &self.metrics
    }
}

/// 独占会话
pub struct Session<'a> {
    driver: MutexGuard<'a, Driver>,
    metrics: &'a RobotMetrics,
    kind: SessionKind,
}

impl Session<'_> {
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn driver(&mut self) -> &mut Driver {
        &mut self.driver
    }

    pub(crate) fn metrics(&self) -> &RobotMetrics {
        self.metrics
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.metrics.sessions_released.fetch_add(1, Ordering::Relaxed);
        debug!("{} session released", self.kind);
    }
}
