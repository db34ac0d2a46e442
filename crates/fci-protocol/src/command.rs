//! 控制命令
//!
//! 每个周期由控制循环组装一条 [`RobotCommand`]，发送后即丢弃。

use crate::state::MotionGeneratorMode;
use crate::validate::{check_finite, check_transform};
use crate::{IDENTITY_TRANSFORM, JOINT_COUNT, ProtocolError};

/// 运动生成器命令
///
/// 只有与 `mode` 对应的字段有意义，其余保持默认值。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionCommand {
    pub mode: MotionGeneratorMode,
    pub q_c: [f64; JOINT_COUNT],
    pub dq_c: [f64; JOINT_COUNT],
    pub o_t_ee_c: [f64; 16],
    pub o_dp_ee_c: [f64; 6],
    pub elbow_c: [f64; 2],
    pub valid_elbow: bool,
}

impl Default for MotionCommand {
    fn default() -> Self {
        Self {
            mode: MotionGeneratorMode::Idle,
            q_c: [0.0; JOINT_COUNT],
            dq_c: [0.0; JOINT_COUNT],
            o_t_ee_c: IDENTITY_TRANSFORM,
            o_dp_ee_c: [0.0; 6],
            elbow_c: [0.0; 2],
            valid_elbow: false,
        }
    }
}

/// 力矩控制命令
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerCommand {
    pub tau_j_d: [f64; JOINT_COUNT],
}

/// 单周期命令
///
/// - `message_id`: 回应的状态序号（控制器据此匹配周期，不做流水线）
/// - `motion_finished`: 所有回调都已请求结束
/// - `last_cycle`: 会话的终止周期（结束后额外发送的一条）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotCommand {
    pub message_id: u64,
    pub motion: Option<MotionCommand>,
    pub control: Option<ControllerCommand>,
    pub motion_finished: bool,
    pub last_cycle: bool,
}

impl RobotCommand {
    /// 创建回应指定状态序号的空命令
    pub fn new(message_id: u64) -> Self {
        Self {
            message_id,
            ..Default::default()
        }
    }

    /// 由上一条命令派生终止周期命令
    ///
    /// 保持上一周期的力矩与运动目标不变，仅更新序号并置位结束标志。
    pub fn terminal_from(previous: &RobotCommand, message_id: u64) -> Self {
        Self {
            message_id,
            motion: previous.motion,
            control: previous.control,
            motion_finished: true,
            last_cycle: true,
        }
    }

    /// 整条命令的数值合法性检查
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Some(control) = &self.control {
            check_finite("tau_j_d", &control.tau_j_d)?;
        }
        if let Some(motion) = &self.motion {
            match motion.mode {
                MotionGeneratorMode::JointPosition => check_finite("q_c", &motion.q_c)?,
                MotionGeneratorMode::JointVelocity => check_finite("dq_c", &motion.dq_c)?,
                MotionGeneratorMode::CartesianPosition => {
                    check_transform("o_t_ee_c", &motion.o_t_ee_c)?
                },
                MotionGeneratorMode::CartesianVelocity => {
                    check_finite("o_dp_ee_c", &motion.o_dp_ee_c)?
                },
                MotionGeneratorMode::Idle => {},
            }
            if motion.valid_elbow {
                check_finite("elbow_c", &motion.elbow_c)?;
            }
        }
        Ok(())
    }
}
