//! 力矩 / 运动生成器控制循环
//!
//! 每个周期严格按顺序：
//! 1. 接收状态（带超时），检查控制器模式，计算周期时长
//! 2. 调用尚未结束的回调；已结束的回调保持最后一次输出
//! 3. 校验本周期的新输出（NaN/∞/非法变换立即终止，不发送）
//! 4. 组装并发送命令
//!
//! 所有回调都请求结束后，再接收一个状态并发送一条 `last_cycle` 终止命令，
//! 让控制器平稳停止，然后正常返回。任何故障都会立即结束循环，不再发送命令。

use super::clock::CycleClock;
use super::mode::ControllerModeMachine;
use super::{CallbackResult, Flow};
use crate::session::Session;
use crate::{CallbackKind, NumericFault, RobotError};
use fci_protocol::{ControllerCommand, MotionCommand, MotionTarget, RobotCommand, RobotState, Torques};
use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, trace};

/// 力矩回调
pub(crate) type TorqueFn<'f> = dyn FnMut(&RobotState, Duration) -> CallbackResult<Torques> + 'f;

/// 运动生成器回调
pub(crate) type MotionFn<'f, M> = dyn FnMut(&RobotState, Duration) -> CallbackResult<M> + 'f;

/// 单个回调的输出槽
struct Slot<T> {
    held: Option<T>,
    finished: bool,
}

impl<T: Copy> Slot<T> {
    fn new(present: bool) -> Self {
        Self {
            held: None,
            finished: !present,
        }
    }

    fn accept(&mut self, flow: Flow<T>) -> T {
        self.finished = flow.is_finished();
        let value = flow.into_inner();
        self.held = Some(value);
        value
    }
}

/// 控制循环
///
/// 以运动表示 `M` 为参数的单一实现；纯力矩会话使用 [`NoMotion`](super::NoMotion)。
pub(crate) struct ControlLoop<'s, 'a, M: MotionTarget> {
    session: &'s mut Session<'a>,
    mode: ControllerModeMachine,
    clock: CycleClock,
    cycle: u64,
    _motion: PhantomData<M>,
}

impl<'s, 'a, M: MotionTarget> ControlLoop<'s, 'a, M> {
    pub(crate) fn new(session: &'s mut Session<'a>, mode: ControllerModeMachine) -> Self {
        let nominal = session.driver().config().control_period();
        Self {
            session,
            mode,
            clock: CycleClock::new(nominal),
            cycle: 0,
            _motion: PhantomData,
        }
    }

    /// 运行到结束或故障，返回实际执行的回调周期数
    pub(crate) fn run(
        mut self,
        mut torque: Option<&mut TorqueFn<'_>>,
        mut motion: Option<&mut MotionFn<'_, M>>,
    ) -> Result<u64, RobotError> {
        let mut torques = Slot::<Torques>::new(torque.is_some());
        let mut targets = Slot::<M>::new(motion.is_some());

        let last = loop {
            let (state, period) = self.next_state()?;

            if let Some(callback) = torque.as_deref_mut().filter(|_| !torques.finished) {
                let flow = callback(&state, period).map_err(RobotError::Callback)?;
                let output = torques.accept(flow);
                output
                    .validate()
                    .map_err(|error| self.numeric_fault(CallbackKind::Torque, error))?;
            }

            if let Some(callback) = motion.as_deref_mut().filter(|_| !targets.finished) {
                let flow = callback(&state, period).map_err(RobotError::Callback)?;
                let output = targets.accept(flow);
                output
                    .validate()
                    .map_err(|error| self.numeric_fault(CallbackKind::Motion, error))?;
            }

            let finished = torques.finished && targets.finished;
            let command = build_command(state.message_id, torques.held, targets.held, finished);
            self.send(command)?;

            if finished {
                break command;
            }
        };

        debug!(
            "All callbacks finished after {} cycles ({:?}), sending terminal command",
            self.cycle,
            self.clock.elapsed()
        );
        let (state, _) = self.next_state()?;
        self.send(RobotCommand::terminal_from(&last, state.message_id))?;

        Ok(self.cycle - 1)
    }

    /// 接收状态 → 模式检查 → 周期时长
    fn next_state(&mut self) -> Result<(RobotState, Duration), RobotError> {
        self.cycle += 1;
        let state = self.session.driver().receive_state()?;

        if let Err(fault) = self.mode.observe(&state, self.cycle) {
            self.session.metrics().control_faults.fetch_add(1, Ordering::Relaxed);
            return Err(fault.into());
        }

        let period = self.clock.tick(state.time).map_err(RobotError::Communication)?;
        trace!("Cycle {}: state #{}, period {:?}", self.cycle, state.message_id, period);
        Ok((state, period))
    }

    fn send(&mut self, command: RobotCommand) -> Result<(), RobotError> {
        self.session.driver().send_command(command)?;
        Ok(())
    }

    fn numeric_fault(&self, callback: CallbackKind, error: fci_protocol::ProtocolError) -> RobotError {
        self.session.metrics().numeric_faults.fetch_add(1, Ordering::Relaxed);
        NumericFault {
            cycle: self.cycle,
            callback,
            error,
        }
        .into()
    }
}

fn build_command<M: MotionTarget>(
    message_id: u64,
    torques: Option<Torques>,
    target: Option<M>,
    finished: bool,
) -> RobotCommand {
    let mut command = RobotCommand::new(message_id);
    if let Some(torques) = torques {
        let mut control = ControllerCommand::default();
        torques.merge_into(&mut control);
        command.control = Some(control);
    }
    if let Some(target) = target {
        let mut motion = MotionCommand::default();
        target.merge_into(&mut motion);
        command.motion = Some(motion);
    }
    command.motion_finished = finished;
    command
}
