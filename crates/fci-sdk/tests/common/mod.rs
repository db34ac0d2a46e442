//! 集成测试共用的脚本化通道
//!
//! 状态按脚本逐个返回，脚本耗尽后继续产生状态（时间按 1ms 递增）。

#![allow(dead_code)]

use fci_protocol::{
    ConfigReply, ConfigRequest, ConfigResponse, ReportedControllerMode, RobotCommand, RobotState,
};
use fci_sdk::RobotConfig;
use fci_sdk::client::RealtimeConfig;
use fci_transport::{Channel, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PERIOD: Duration = Duration::from_millis(1);

/// 脚本中的一步
pub enum Step {
    /// 正常状态，可覆盖上报的控制器模式
    State(Option<ReportedControllerMode>),
    /// 指定时间戳的状态
    StateAt(Duration),
    Timeout,
}

#[derive(Default)]
struct Recorded {
    sent: Vec<RobotCommand>,
    requests: Vec<ConfigRequest>,
}

pub struct ScriptedChannel {
    script: VecDeque<Step>,
    base: RobotState,
    next_id: u64,
    time: Duration,
    recorded: Arc<Mutex<Recorded>>,
}

#[derive(Clone)]
pub struct ScriptHandle {
    recorded: Arc<Mutex<Recorded>>,
}

impl ScriptHandle {
    pub fn sent(&self) -> Vec<RobotCommand> {
        self.recorded.lock().unwrap().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.recorded.lock().unwrap().sent.len()
    }

    pub fn requests(&self) -> Vec<ConfigRequest> {
        self.recorded.lock().unwrap().requests.clone()
    }
}

impl ScriptedChannel {
    pub fn new(script: Vec<Step>) -> (Self, ScriptHandle) {
        Self::with_mode(script, ReportedControllerMode::JointImpedance)
    }

    pub fn with_mode(script: Vec<Step>, mode: ReportedControllerMode) -> (Self, ScriptHandle) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let base = RobotState {
            controller_mode: mode,
            ..Default::default()
        };
        (
            Self {
                script: script.into(),
                base,
                next_id: 1,
                time: Duration::ZERO,
                recorded: recorded.clone(),
            },
            ScriptHandle { recorded },
        )
    }

    fn produce(&mut self, mode: Option<ReportedControllerMode>, time: Option<Duration>) -> RobotState {
        self.time = time.unwrap_or(self.time + PERIOD);
        let mut state = self.base.clone();
        state.message_id = self.next_id;
        state.time = self.time;
        if let Some(mode) = mode {
            state.controller_mode = mode;
        }
        self.next_id += 1;
        state
    }
}

impl Channel for ScriptedChannel {
    fn receive_state(&mut self, timeout: Duration) -> Result<RobotState, TransportError> {
        match self.script.pop_front() {
            Some(Step::State(mode)) => Ok(self.produce(mode, None)),
            Some(Step::StateAt(time)) => Ok(self.produce(None, Some(time))),
            Some(Step::Timeout) => Err(TransportError::Timeout(timeout)),
            None => Ok(self.produce(None, None)),
        }
    }

    fn send_command(&mut self, command: RobotCommand) -> Result<(), TransportError> {
        self.recorded.lock().unwrap().sent.push(command);
        Ok(())
    }

    fn request(
        &mut self,
        request: &ConfigRequest,
        _timeout: Duration,
    ) -> Result<ConfigResponse, TransportError> {
        self.recorded.lock().unwrap().requests.push(request.clone());
        Ok(ConfigResponse::Success(ConfigReply::Done))
    }

    fn server_version(&self) -> u16 {
        5
    }
}

/// 测试用配置：不要求实时优先级
pub fn test_config() -> RobotConfig {
    RobotConfig::default().with_realtime(RealtimeConfig::Ignore)
}

/// `n` 次调用后结束的回调
pub fn finish_after<T: Copy>(
    n: usize,
    value: T,
) -> impl FnMut(&RobotState, Duration) -> fci_sdk::CallbackResult<T> {
    let mut calls = 0;
    move |_, _| {
        calls += 1;
        Ok(if calls >= n {
            fci_sdk::Flow::Finished(value)
        } else {
            fci_sdk::Flow::Continue(value)
        })
    }
}
