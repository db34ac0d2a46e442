//! 运行指标
//!
//! 所有计数器都是原子变量，可以在任何线程读取，不会与控制线程产生锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 机器人连接的实时指标
///
/// # 使用示例
///
/// ```rust
/// use fci_driver::RobotMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = RobotMetrics::default();
/// metrics.states_received.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.states_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct RobotMetrics {
    /// 收到的状态数
    pub states_received: AtomicU64,
    /// 发出的周期命令数
    pub commands_sent: AtomicU64,
    /// 接收超时次数
    pub receive_timeouts: AtomicU64,
    /// 其他通道错误次数（报文损坏、发送失败、通道关闭）
    pub transport_errors: AtomicU64,

    /// 发出的配置请求数
    pub requests_sent: AtomicU64,
    /// 被控制器拒绝的配置请求数
    pub requests_rejected: AtomicU64,

    /// 成功开始的会话数（含配置请求占用）
    pub sessions_started: AtomicU64,
    /// 已释放的会话数
    pub sessions_released: AtomicU64,
    /// 因已有会话而被拒绝的次数
    pub sessions_rejected: AtomicU64,

    /// 控制器模式不一致导致的故障
    pub control_faults: AtomicU64,
    /// 回调输出非法数值导致的故障
    pub numeric_faults: AtomicU64,
}

impl RobotMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别读取，彼此之间可能存在微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            states_received: self.states_received.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            receive_timeouts: self.receive_timeouts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_released: self.sessions_released.load(Ordering::Relaxed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
            control_faults: self.control_faults.load(Ordering::Relaxed),
            numeric_faults: self.numeric_faults.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.states_received.store(0, Ordering::Relaxed);
        self.commands_sent.store(0, Ordering::Relaxed);
        self.receive_timeouts.store(0, Ordering::Relaxed);
        self.transport_errors.store(0, Ordering::Relaxed);
        self.requests_sent.store(0, Ordering::Relaxed);
        self.requests_rejected.store(0, Ordering::Relaxed);
        self.sessions_started.store(0, Ordering::Relaxed);
        self.sessions_released.store(0, Ordering::Relaxed);
        self.sessions_rejected.store(0, Ordering::Relaxed);
        self.control_faults.store(0, Ordering::Relaxed);
        self.numeric_faults.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub states_received: u64,
    pub commands_sent: u64,
    pub receive_timeouts: u64,
    pub transport_errors: u64,
    pub requests_sent: u64,
    pub requests_rejected: u64,
    pub sessions_started: u64,
    pub sessions_released: u64,
    pub sessions_rejected: u64,
    pub control_faults: u64,
    pub numeric_faults: u64,
}

impl MetricsSnapshot {
    /// 当前仍在运行的会话数（0 或 1）
    pub fn active_sessions(&self) -> u64 {
        self.sessions_started.saturating_sub(self.sessions_released)
    }

    /// 配置请求被拒绝的比例（百分比）
    ///
    /// 返回 0.0 到 100.0 之间的值。如果没有发出过请求，返回 0.0。
    pub fn rejection_rate(&self) -> f64 {
        if self.requests_sent == 0 {
            return 0.0;
        }
        (self.requests_rejected as f64 / self.requests_sent as f64) * 100.0
    }
}
