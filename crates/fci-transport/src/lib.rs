//! # FCI Transport Layer
//!
//! 主机与机器人控制器之间的通道抽象。
//!
//! 每个控制周期严格交换一次“状态 → 命令”，消息的分帧与序列化由具体实现负责，
//! 上层只依赖 [`Channel`] trait。

use fci_protocol::{ConfigRequest, ConfigResponse, RobotCommand, RobotState};
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "mock")]
pub mod loopback;

#[cfg(feature = "mock")]
pub use loopback::{Injection, LoopbackChannel, LoopbackConfig, LoopbackHandle};

/// 通道层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Receive timeout after {0:?}")]
    Timeout(Duration),
    #[error("Malformed message: {0}")]
    Malformed(String),
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Channel closed")]
    Closed,
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// 主机 ↔ 控制器通道
///
/// - `receive_state`: 阻塞接收一个状态，超时返回 [`TransportError::Timeout`]
/// - `send_command`: 发送本周期命令（控制器按周期确认，不做流水线）
/// - `request`: 同步发送配置请求并等待响应
pub trait Channel: Send {
    fn receive_state(&mut self, timeout: Duration) -> Result<RobotState, TransportError>;

    fn send_command(&mut self, command: RobotCommand) -> Result<(), TransportError>;

    fn request(
        &mut self,
        request: &ConfigRequest,
        timeout: Duration,
    ) -> Result<ConfigResponse, TransportError>;

    /// 连接时控制器上报的协议版本
    fn server_version(&self) -> u16;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn receive_state(&mut self, timeout: Duration) -> Result<RobotState, TransportError> {
        (**self).receive_state(timeout)
    }

    fn send_command(&mut self, command: RobotCommand) -> Result<(), TransportError> {
        (**self).send_command(command)
    }

    fn request(
        &mut self,
        request: &ConfigRequest,
        timeout: Duration,
    ) -> Result<ConfigResponse, TransportError> {
        (**self).request(request, timeout)
    }

    fn server_version(&self) -> u16 {
        (**self).server_version()
    }
}
