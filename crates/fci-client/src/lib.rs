//! 客户端接口模块
//!
//! 本模块提供机器人实时控制的用户接口，包括：
//! - 独占会话（同一时刻只有一个控制/读取/配置操作）
//! - 力矩、运动生成器与只读循环
//! - 控制器模式监督
//! - 配置命令的本地校验与同步执行
//!
//! 大多数用户只需要 [`Robot`]。

mod config;
pub mod control;
mod dispatcher;
mod error;
mod robot;
pub mod session;

pub use config::RobotConfig;
pub use control::{CallbackResult, ControllerModeMachine, Flow, ModeState, NoMotion};
pub use error::{
    CallbackError, CallbackKind, ControlFault, ErrorKind, NumericFault, RobotError,
};
pub use robot::Robot;
pub use session::{Session, SessionGuard, SessionKind};

// 常用的驱动层类型
pub use fci_driver::{DriverConfig, MetricsSnapshot, RealtimeConfig, StateObserver};
