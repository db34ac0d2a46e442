//! 驱动层错误类型定义

use fci_protocol::{ProtocolError, RejectReason};
use fci_transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 通道错误（超时、报文损坏、发送失败）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 参数/数值错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 控制器拒绝配置请求
    #[error("{command} rejected: {reason}")]
    Rejected {
        command: &'static str,
        reason: RejectReason,
    },

    /// 控制器时钟未递增
    #[error("Robot clock did not advance ({previous:?} -> {current:?})")]
    NonMonotonicTime {
        previous: Duration,
        current: Duration,
    },

    /// 实时线程设置失败
    #[error("Real-time setup failed: {0}")]
    Realtime(String),

    /// 配置无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 响应类型与请求不匹配
    #[error("Unexpected reply to {command}")]
    UnexpectedReply { command: &'static str },
}

impl DriverError {
    /// 是否为接收超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Transport(e) if e.is_timeout())
    }
}
