//! 力矩与运动生成器目标
//!
//! 四种运动表示（关节位置、关节速度、笛卡尔位姿、笛卡尔速度）共用一个
//! [`MotionTarget`] trait，控制循环只针对该 trait 编写一次，
//! 每种表示只需实现自己的校验与合并逻辑。

use crate::command::{ControllerCommand, MotionCommand};
use crate::state::MotionGeneratorMode;
use crate::validate::{check_finite, check_transform};
use crate::{JOINT_COUNT, ProtocolError};

/// 运动生成器目标
///
/// 实现者负责：
/// - `validate()`: 数值合法性（有限值、齐次变换等）
/// - `merge_into()`: 写入命令中属于自己的字段
pub trait MotionTarget: Copy + std::fmt::Debug {
    /// 对应的控制器运动生成器类型
    const MODE: MotionGeneratorMode;

    /// 数值合法性检查
    fn validate(&self) -> Result<(), ProtocolError>;

    /// 合并到运动命令
    fn merge_into(&self, command: &mut MotionCommand);
}

/// 关节力矩（Nm），不含重力补偿
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Torques {
    pub tau_j: [f64; JOINT_COUNT],
}

impl Torques {
    pub fn new(tau_j: [f64; JOINT_COUNT]) -> Self {
        Self { tau_j }
    }

    /// 全零力矩
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_finite("tau_j", &self.tau_j)
    }

    pub fn merge_into(&self, command: &mut ControllerCommand) {
        command.tau_j_d = self.tau_j;
    }
}

impl From<[f64; JOINT_COUNT]> for Torques {
    fn from(tau_j: [f64; JOINT_COUNT]) -> Self {
        Self::new(tau_j)
    }
}

/// 关节位置目标（rad）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointPositions {
    pub q: [f64; JOINT_COUNT],
}

impl JointPositions {
    pub fn new(q: [f64; JOINT_COUNT]) -> Self {
        Self { q }
    }
}

impl From<[f64; JOINT_COUNT]> for JointPositions {
    fn from(q: [f64; JOINT_COUNT]) -> Self {
        Self::new(q)
    }
}

impl MotionTarget for JointPositions {
    const MODE: MotionGeneratorMode = MotionGeneratorMode::JointPosition;

    fn validate(&self) -> Result<(), ProtocolError> {
        check_finite("q_c", &self.q)
    }

    fn merge_into(&self, command: &mut MotionCommand) {
        command.mode = Self::MODE;
        command.q_c = self.q;
    }
}

/// 关节速度目标（rad/s）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointVelocities {
    pub dq: [f64; JOINT_COUNT],
}

impl JointVelocities {
    pub fn new(dq: [f64; JOINT_COUNT]) -> Self {
        Self { dq }
    }
}

impl From<[f64; JOINT_COUNT]> for JointVelocities {
    fn from(dq: [f64; JOINT_COUNT]) -> Self {
        Self::new(dq)
    }
}

impl MotionTarget for JointVelocities {
    const MODE: MotionGeneratorMode = MotionGeneratorMode::JointVelocity;

    fn validate(&self) -> Result<(), ProtocolError> {
        check_finite("dq_c", &self.dq)
    }

    fn merge_into(&self, command: &mut MotionCommand) {
        command.mode = Self::MODE;
        command.dq_c = self.dq;
    }
}

/// 笛卡尔位姿目标
///
/// `o_t_ee` 为列主序齐次变换；`elbow` 可选，为 `None` 时控制器自行决定肘部构型。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CartesianPose {
    pub o_t_ee: [f64; 16],
    pub elbow: Option<[f64; 2]>,
}

impl CartesianPose {
    pub fn new(o_t_ee: [f64; 16]) -> Self {
        Self {
            o_t_ee,
            elbow: None,
        }
    }

    pub fn with_elbow(o_t_ee: [f64; 16], elbow: [f64; 2]) -> Self {
        Self {
            o_t_ee,
            elbow: Some(elbow),
        }
    }
}

impl MotionTarget for CartesianPose {
    const MODE: MotionGeneratorMode = MotionGeneratorMode::CartesianPosition;

    fn validate(&self) -> Result<(), ProtocolError> {
        check_transform("o_t_ee_c", &self.o_t_ee)?;
        match &self.elbow {
            Some(elbow) => check_finite("elbow_c", elbow),
            None => Ok(()),
        }
    }

    fn merge_into(&self, command: &mut MotionCommand) {
        command.mode = Self::MODE;
        command.o_t_ee_c = self.o_t_ee;
        merge_elbow(self.elbow, command);
    }
}

/// 笛卡尔速度目标 `[vx, vy, vz, ωx, ωy, ωz]`（基座系）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CartesianVelocities {
    pub o_dp_ee: [f64; 6],
    pub elbow: Option<[f64; 2]>,
}

impl CartesianVelocities {
    pub fn new(o_dp_ee: [f64; 6]) -> Self {
        Self {
            o_dp_ee,
            elbow: None,
        }
    }

    pub fn with_elbow(o_dp_ee: [f64; 6], elbow: [f64; 2]) -> Self {
        Self {
            o_dp_ee,
            elbow: Some(elbow),
        }
    }
}

impl MotionTarget for CartesianVelocities {
    const MODE: MotionGeneratorMode = MotionGeneratorMode::CartesianVelocity;

    fn validate(&self) -> Result<(), ProtocolError> {
        check_finite("o_dp_ee_c", &self.o_dp_ee)?;
        match &self.elbow {
            Some(elbow) => check_finite("elbow_c", elbow),
            None => Ok(()),
        }
    }

    fn merge_into(&self, command: &mut MotionCommand) {
        command.mode = Self::MODE;
        command.o_dp_ee_c = self.o_dp_ee;
        merge_elbow(self.elbow, command);
    }
}

fn merge_elbow(elbow: Option<[f64; 2]>, command: &mut MotionCommand) {
    match elbow {
        Some(elbow) => {
            command.elbow_c = elbow;
            command.valid_elbow = true;
        },
        None => command.valid_elbow = false,
    }
}
