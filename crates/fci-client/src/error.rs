//! 错误类型体系
//!
//! 会话的每一种终止原因都是一个可区分的变体，调用方据此决定是否重试。
//!
//! # 示例
//!
//! ```rust
//! use fci_client::RobotError;
//!
//! fn handle_error(err: RobotError) {
//!     if err.is_fatal() {
//!         eprintln!("会话终止: {}", err);
//!     } else if err.is_retryable() {
//!         eprintln!("可重试错误: {}", err);
//!     } else {
//!         eprintln!("错误: {}", err);
//!     }
//! }
//! ```

use fci_driver::DriverError;
use fci_protocol::{ProtocolError, RejectReason, ReportedControllerMode};
use thiserror::Error;

/// 回调返回的错误（原样向调用方抛出）
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// 控制故障（控制器模式被机器人改变）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlFault {
    #[error(
        "controller mode mismatch at cycle {cycle}: expected {expected:?}, robot reported {reported:?}"
    )]
    ModeMismatch {
        expected: ReportedControllerMode,
        reported: ReportedControllerMode,
        cycle: u64,
    },
}

/// 产生非法输出的回调
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Torque,
    Motion,
}

impl std::fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackKind::Torque => write!(f, "torque"),
            CallbackKind::Motion => write!(f, "motion generator"),
        }
    }
}

/// 数值故障（回调输出 NaN/∞ 或非法变换）
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{callback} callback produced invalid output at cycle {cycle}: {error}")]
pub struct NumericFault {
    pub cycle: u64,
    pub callback: CallbackKind,
    #[source]
    pub error: ProtocolError,
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SessionBusy,
    InvalidArgument,
    Control,
    Communication,
    Numeric,
    Callback,
    Configuration,
    Realtime,
}

/// 机器人错误类型
#[derive(Debug, Error)]
pub enum RobotError {
    /// 已有控制或读取会话在运行
    #[error("Control or read operation already running")]
    SessionBusy,

    /// 参数无效（未发送任何命令）
    #[error("Invalid argument '{param}': {reason}")]
    InvalidArgument { param: String, reason: String },

    /// 控制器模式不一致
    #[error("Control fault: {0}")]
    Control(#[from] ControlFault),

    /// 通道超时、报文损坏或发送失败
    #[error("Communication fault: {0}")]
    Communication(#[source] DriverError),

    /// 回调输出非法数值
    #[error("Numeric fault: {0}")]
    Numeric(#[from] NumericFault),

    /// 回调返回错误
    #[error("Callback failed: {0}")]
    Callback(#[source] CallbackError),

    /// 控制器拒绝配置命令
    #[error("{command} rejected by controller: {reason}")]
    ConfigRejected {
        command: &'static str,
        reason: RejectReason,
    },

    /// 无法获得实时调度
    #[error("Real-time setup failed: {0}")]
    Realtime(String),
}

impl RobotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionBusy => ErrorKind::SessionBusy,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Control(_) => ErrorKind::Control,
            Self::Communication(_) => ErrorKind::Communication,
            Self::Numeric(_) => ErrorKind::Numeric,
            Self::Callback(_) => ErrorKind::Callback,
            Self::ConfigRejected { .. } => ErrorKind::Configuration,
            Self::Realtime(_) => ErrorKind::Realtime,
        }
    }

    /// 是否为会话中途的终止性故障
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Control(_) | Self::Communication(_) | Self::Numeric(_) | Self::Callback(_)
        )
    }

    /// 是否可重试（由调用方开始新的会话/请求）
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SessionBusy => true,
            Self::Communication(e) => e.is_timeout(),
            Self::ConfigRejected { reason, .. } => matches!(reason, RejectReason::Preempted),
            _ => false,
        }
    }

    pub(crate) fn invalid_argument(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            param: param.into(),
            reason: reason.into(),
        }
    }
}

impl From<ProtocolError> for RobotError {
    fn from(e: ProtocolError) -> Self {
        Self::invalid_argument(e.field(), e.to_string())
    }
}

impl From<DriverError> for RobotError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Protocol(e) => e.into(),
            DriverError::InvalidConfig(reason) => Self::invalid_argument("config", reason),
            DriverError::Rejected { command, reason } => Self::ConfigRejected { command, reason },
            DriverError::Realtime(reason) => Self::Realtime(reason),
            other => Self::Communication(other),
        }
    }
}
