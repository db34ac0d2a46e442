//! 驱动对象
//!
//! [`Driver`] 独占一个 [`Channel`]，负责：
//! - 每周期接收状态并发布到 [`StateObserver`]
//! - 发送周期命令
//! - 同步执行配置请求（一次只有一条在途）
//! - 统计 [`RobotMetrics`]
//!
//! 驱动本身不做互斥，互斥由上层会话锁保证。

use crate::{DriverConfig, DriverError, RobotMetrics, StateObserver};
use fci_protocol::{ConfigReply, ConfigRequest, ConfigResponse, RobotCommand, RobotState};
use fci_transport::{Channel, TransportError};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace, warn};

/// 控制器驱动
pub struct Driver {
    channel: Box<dyn Channel>,
    config: DriverConfig,
    observer: StateObserver,
    metrics: Arc<RobotMetrics>,
    server_version: u16,
}

impl Driver {
    /// 接管通道
    pub fn new(channel: impl Channel + 'static, config: DriverConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let server_version = channel.server_version();
        info!(
            "Driver connected (server version {}, control period {:?})",
            server_version,
            config.control_period()
        );

        Ok(Self {
            channel: Box::new(channel),
            config,
            observer: StateObserver::new(),
            metrics: Arc::new(RobotMetrics::new()),
            server_version,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 控制器协议版本
    pub fn server_version(&self) -> u16 {
        self.server_version
    }

    /// 最新状态观察者
    pub fn observer(&self) -> StateObserver {
        self.observer.clone()
    }

    pub fn metrics(&self) -> &Arc<RobotMetrics> {
        &self.metrics
    }

    /// 接收一个状态（超时 = 控制周期 + 抖动容差）
    pub fn receive_state(&mut self) -> Result<RobotState, DriverError> {
        match self.channel.receive_state(self.config.receive_timeout()) {
            Ok(state) => {
                self.metrics.states_received.fetch_add(1, Ordering::Relaxed);
                self.observer.publish(&state);
                trace!("Received state #{}", state.message_id);
                Ok(state)
            },
            Err(e) => {
                self.record_transport_error(&e);
                Err(e.into())
            },
        }
    }

    /// 发送本周期命令
    ///
    /// 发送前检查整条命令，含 NaN/∞ 或非法变换的命令不会到达通道。
    pub fn send_command(&mut self, command: RobotCommand) -> Result<(), DriverError> {
        command.validate()?;
        let message_id = command.message_id;
        match self.channel.send_command(command) {
            Ok(()) => {
                self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
                trace!("Sent command #{}", message_id);
                Ok(())
            },
            Err(e) => {
                self.record_transport_error(&e);
                Err(e.into())
            },
        }
    }

    /// 单次读取状态
    pub fn read_once(&mut self) -> Result<RobotState, DriverError> {
        self.receive_state()
    }

    /// 同步执行配置请求
    ///
    /// 控制器拒绝时返回 [`DriverError::Rejected`]，不做任何重试或钳位。
    pub fn execute(&mut self, request: &ConfigRequest) -> Result<ConfigReply, DriverError> {
        self.metrics.requests_sent.fetch_add(1, Ordering::Relaxed);
        debug!("Executing {}", request.name());

        let response = match self.channel.request(request, self.config.request_timeout()) {
            Ok(response) => response,
            Err(e) => {
                self.record_transport_error(&e);
                return Err(e.into());
            },
        };

        match response {
            ConfigResponse::Success(reply) => {
                debug!("{} succeeded", request.name());
                Ok(reply)
            },
            ConfigResponse::Rejected(reason) => {
                self.metrics.requests_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("{} rejected by controller: {}", request.name(), reason);
                Err(DriverError::Rejected {
                    command: request.name(),
                    reason,
                })
            },
        }
    }

    fn record_transport_error(&self, error: &TransportError) {
        if error.is_timeout() {
            self.metrics.receive_timeouts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.transport_errors.fetch_add(1, Ordering::Relaxed);
        }
        warn!("Transport error: {}", error);
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("server_version", &self.server_version)
            .finish_non_exhaustive()
    }
}
