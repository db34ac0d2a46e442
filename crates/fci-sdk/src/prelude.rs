//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use fci_sdk::prelude::*;
//! ```

// 客户端层
pub use crate::client::{
    CallbackResult, ControllerModeMachine, Flow, MetricsSnapshot, RealtimeConfig, Robot,
    RobotConfig, StateObserver,
};

// 运动表示与配置类型
pub use crate::protocol::{
    CartesianPose, CartesianVelocities, CollisionThresholds, ConfigReply, ConfigRequest,
    ControllerMode, JointPositions, JointVelocities, LoadParameters, MotionTarget, RobotMode,
    RobotState, Torques, VirtualWallCuboid,
};

// 通道
pub use crate::transport::Channel;

// 错误类型
pub use crate::client::{ControlFault, ErrorKind, RobotError};
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::transport::TransportError;
