//! 驱动层模块
//!
//! 本模块提供机器人控制器连接的底层管理，包括：
//! - 通道独占与状态/命令收发
//! - 最新状态发布（ArcSwap 无锁读取）
//! - 配置请求的同步执行
//! - 运行指标与实时线程设置
//!
//! 大多数用户应该使用 `fci-client` 提供的 `Robot` 接口。

mod config;
mod driver;
mod error;
pub mod metrics;
pub mod realtime;
pub mod state;

pub use config::{DriverConfig, MAX_CYCLE_US};
pub use driver::Driver;
pub use error::DriverError;
pub use metrics::{MetricsSnapshot, RobotMetrics};
pub use realtime::{RealtimeConfig, apply_realtime};
pub use state::StateObserver;
