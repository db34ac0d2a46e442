//! 实时控制循环
//!
//! - [`mode`]: 控制器模式状态机
//! - `control_loop`: 力矩/运动生成器循环（一个泛型实现覆盖所有运动表示）
//! - `read_loop`: 只读循环
//!
//! 回调在调用线程上、与机器人控制周期同步执行。回调应在剩余周期预算内返回，
//! 不能阻塞在 IO 或无界计算上。

mod clock;
pub(crate) mod control_loop;
pub mod mode;
pub(crate) mod read_loop;

pub use mode::{ControllerModeMachine, ModeState};

use crate::CallbackError;
use fci_protocol::{MotionCommand, MotionGeneratorMode, MotionTarget, ProtocolError};

/// 回调的单周期输出
///
/// - `Continue(value)`: 继续下一个周期
/// - `Finished(value)`: 本周期输出 `value` 后结束（之后保持该输出）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<T> {
    Continue(T),
    Finished(T),
}

impl<T> Flow<T> {
    pub fn into_inner(self) -> T {
        match self {
            Flow::Continue(value) | Flow::Finished(value) => value,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Flow::Finished(_))
    }
}

/// 回调返回值
pub type CallbackResult<T> = Result<Flow<T>, CallbackError>;

/// 无运动生成器（纯力矩会话）
///
/// 不可构造，`ControlLoop<NoMotion>` 中的运动分支在编译期即被排除。
#[derive(Debug, Clone, Copy)]
pub enum NoMotion {}

impl MotionTarget for NoMotion {
    const MODE: MotionGeneratorMode = MotionGeneratorMode::Idle;

    fn validate(&self) -> Result<(), ProtocolError> {
        match *self {}
    }

    fn merge_into(&self, _command: &mut MotionCommand) {
        match *self {}
    }
}
