//! # FCI Protocol
//!
//! 机械臂控制器交互数据定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `state`: 每周期接收的机器人状态快照
//! - `command`: 每周期发送的控制命令
//! - `motion`: 力矩与运动生成器目标（关节/笛卡尔空间）
//! - `config`: 一次性配置命令（请求/响应）
//! - `validate`: 数值合法性检查
//!
//! ## 坐标约定
//!
//! 所有 4x4 齐次变换矩阵均按 **列主序** 存储为 `[f64; 16]`，
//! 与控制器侧的约定一致。

pub mod command;
pub mod config;
pub mod motion;
pub mod state;
pub mod validate;

// 重新导出常用类型
pub use command::*;
pub use config::*;
pub use motion::*;
pub use state::*;

use thiserror::Error;

/// 关节数量
pub const JOINT_COUNT: usize = 7;

/// 笛卡尔空间自由度
pub const CARTESIAN_DOF: usize = 6;

/// 单位齐次变换（列主序）
pub const IDENTITY_TRANSFORM: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// 协议层错误类型
///
/// 只描述数据本身的问题（非有限值、非法变换、越界参数），与 IO 无关。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Non-finite value in {field}[{index}]: {value}")]
    NonFinite {
        field: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{field} is not a valid homogeneous transformation")]
    InvalidTransform { field: &'static str },

    #[error("Invalid parameter '{param}': {reason}")]
    InvalidParameter { param: &'static str, reason: String },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u8 },
}

impl ProtocolError {
    /// 出错的字段/参数名
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonFinite { field, .. }
            | Self::InvalidTransform { field }
            | Self::InvalidValue { field, .. } => field,
            Self::InvalidParameter { param, .. } => param,
        }
    }
}
