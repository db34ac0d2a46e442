//! FCI SDK - 机械臂实时控制 Rust SDK
//!
//! 以控制器的节拍（通常 1 kHz）运行用户回调，对机器人做力矩控制或运动生成。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **协议层** (`protocol`): 状态、命令与配置请求类型及数值校验
//! - **通道层** (`transport`): 主机 ↔ 控制器通道抽象，附带进程内模拟控制器
//! - **驱动层** (`driver`): 通道独占、状态发布、请求执行、运行指标
//! - **客户端层** (`client`): 独占会话、控制循环、控制器模式监督
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use fci_sdk::prelude::*;
//!
//! # fn channel() -> Box<dyn Channel> { unimplemented!() }
//! let robot = Robot::connect(channel(), RobotConfig::default())?;
//! robot.set_joint_impedance([3000.0, 3000.0, 3000.0, 2500.0, 2500.0, 2000.0, 2000.0])?;
//! robot.read(|state| {
//!     println!("q = {:?}", state.q);
//!     false
//! })?;
//! # Ok::<(), RobotError>(())
//! ```

pub use fci_client as client;
pub use fci_driver as driver;
pub use fci_protocol as protocol;
pub use fci_transport as transport;

pub mod logging;
pub mod prelude;

// 客户端层（推荐入口）
pub use fci_client::{
    CallbackError, CallbackResult, ControlFault, ErrorKind, Flow, Robot, RobotConfig, RobotError,
};

// 协议层常用类型
pub use fci_protocol::{
    CartesianPose, CartesianVelocities, ControllerMode, JointPositions, JointVelocities,
    ProtocolError, RobotState, Torques,
};

// 通道层
pub use fci_transport::{Channel, TransportError};

// 驱动层
pub use fci_driver::DriverError;

pub use logging::{init_logging, try_init_logging};
