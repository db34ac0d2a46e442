//! 控制器模式状态机
//!
//! ```text
//! Idle ──request()──► ModeRequested ──匹配──► ModeConfirmed ◄─┐
//!                          │                     │  └─匹配─────┘
//!                          └──────不匹配─────────┴──► Faulted（终止）
//! ```
//!
//! 除了开始新会话外没有回到 Idle 的转换。

use crate::ControlFault;
use fci_protocol::{ControllerMode, ReportedControllerMode, RobotState};
use tracing::{debug, warn};

/// 状态机状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    Idle,
    ModeRequested,
    ModeConfirmed,
    Faulted,
}

/// 控制器模式监督
#[derive(Debug, Clone)]
pub struct ControllerModeMachine {
    state: ModeState,
    expected: Option<ReportedControllerMode>,
    /// Idle 时是否把第一个观测到的模式当作期望模式
    latch_first: bool,
    fault: Option<ControlFault>,
}

impl ControllerModeMachine {
    /// 不监督（一直保持 Idle）
    pub fn unenforced() -> Self {
        Self {
            state: ModeState::Idle,
            expected: None,
            latch_first: false,
            fault: None,
        }
    }

    /// 隐含模式：会话第一个状态的模式即为期望模式
    pub fn implied() -> Self {
        Self {
            latch_first: true,
            ..Self::unenforced()
        }
    }

    /// 显式请求的模式（配置命令已发出）
    pub fn requested(mode: ControllerMode) -> Self {
        let mut machine = Self::unenforced();
        machine.request(mode);
        machine
    }

    /// Idle → ModeRequested
    pub fn request(&mut self, mode: ControllerMode) {
        self.expected = Some(mode.reported());
        self.state = ModeState::ModeRequested;
        debug!("Controller mode requested: {}", mode);
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    pub fn expected(&self) -> Option<ReportedControllerMode> {
        self.expected
    }

    /// 检查本周期上报的模式
    pub fn observe(&mut self, state: &RobotState, cycle: u64) -> Result<(), ControlFault> {
        let reported = state.controller_mode;
        match self.state {
            ModeState::Idle => {
                if self.latch_first {
                    self.expected = Some(reported);
                    self.state = ModeState::ModeConfirmed;
                    debug!("Implied controller mode: {:?}", reported);
                }
                Ok(())
            },
            ModeState::ModeRequested | ModeState::ModeConfirmed => match self.expected {
                Some(expected) if expected == reported => {
                    if self.state == ModeState::ModeRequested {
                        debug!("Controller mode confirmed at cycle {}: {:?}", cycle, reported);
                    }
                    self.state = ModeState::ModeConfirmed;
                    Ok(())
                },
                Some(expected) => {
                    let fault = ControlFault::ModeMismatch {
                        expected,
                        reported,
                        cycle,
                    };
                    warn!("{}", fault);
                    self.state = ModeState::Faulted;
                    self.fault = Some(fault.clone());
                    Err(fault)
                },
                None => Ok(()),
            },
            ModeState::Faulted => match &self.fault {
                Some(fault) => Err(fault.clone()),
                None => Ok(()),
            },
        }
    }
}
