//! 只读循环
//!
//! 每周期接收一个状态并交给谓词，谓词返回 `false` 时结束。不产生任何命令。

use super::mode::ControllerModeMachine;
use crate::RobotError;
use crate::session::Session;
use fci_protocol::RobotState;
use std::sync::atomic::Ordering;
use tracing::trace;

/// 运行读取循环，返回处理的状态数
pub(crate) fn run_read_loop(
    session: &mut Session<'_>,
    mut mode: ControllerModeMachine,
    predicate: &mut dyn FnMut(&RobotState) -> bool,
) -> Result<u64, RobotError> {
    let mut cycle = 0;
    loop {
        cycle += 1;
        let state = session.driver().receive_state()?;

        if let Err(fault) = mode.observe(&state, cycle) {
            session.metrics().control_faults.fetch_add(1, Ordering::Relaxed);
            return Err(fault.into());
        }

        if !predicate(&state) {
            trace!("Read predicate stopped at cycle {}", cycle);
            return Ok(cycle);
        }
    }
}
