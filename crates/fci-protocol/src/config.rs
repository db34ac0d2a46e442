//! 一次性配置命令（请求/响应）
//!
//! 配置命令在周期会话之外发送，每次只有一条在途。
//! 所有请求都是一个封闭枚举 [`ConfigRequest`] 的变体，
//! 发送前用 [`ConfigRequest::validate`] 在本地检查参数。

use crate::state::ReportedControllerMode;
use crate::validate::{check_finite, check_non_negative, check_transform, is_symmetric};
use crate::{CARTESIAN_DOF, JOINT_COUNT, ProtocolError};
use thiserror::Error;

/// 可请求的控制器模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ControllerMode {
    /// 关节阻抗
    JointImpedance = 0x00,
    /// 笛卡尔阻抗
    CartesianImpedance = 0x01,
}

impl Default for ControllerMode {
    fn default() -> Self {
        ControllerMode::JointImpedance
    }
}

impl ControllerMode {
    /// 从原始标签解析
    ///
    /// 只有可选择的模式才合法；外部控制器等上报专用值返回错误。
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Self::try_from(value).map_err(|_| ProtocolError::InvalidValue {
            field: "controller_mode",
            value,
        })
    }

    /// 控制器确认该模式后在状态中上报的值
    pub fn reported(self) -> ReportedControllerMode {
        match self {
            ControllerMode::JointImpedance => ReportedControllerMode::JointImpedance,
            ControllerMode::CartesianImpedance => ReportedControllerMode::CartesianImpedance,
        }
    }
}

impl std::fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerMode::JointImpedance => write!(f, "joint impedance"),
            ControllerMode::CartesianImpedance => write!(f, "cartesian impedance"),
        }
    }
}

/// 碰撞检测阈值
///
/// 分为加速/减速阶段（`*_acceleration`）与匀速阶段（`*_nominal`）两组；
/// 超过 lower 阈值记为接触，超过 upper 阈值触发反射。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionThresholds {
    pub lower_torque_acceleration: [f64; JOINT_COUNT],
    pub upper_torque_acceleration: [f64; JOINT_COUNT],
    pub lower_torque_nominal: [f64; JOINT_COUNT],
    pub upper_torque_nominal: [f64; JOINT_COUNT],
    pub lower_force_acceleration: [f64; CARTESIAN_DOF],
    pub upper_force_acceleration: [f64; CARTESIAN_DOF],
    pub lower_force_nominal: [f64; CARTESIAN_DOF],
    pub upper_force_nominal: [f64; CARTESIAN_DOF],
}

impl CollisionThresholds {
    /// 两个阶段共用同一组阈值
    pub fn uniform(
        lower_torque: [f64; JOINT_COUNT],
        upper_torque: [f64; JOINT_COUNT],
        lower_force: [f64; CARTESIAN_DOF],
        upper_force: [f64; CARTESIAN_DOF],
    ) -> Self {
        Self {
            lower_torque_acceleration: lower_torque,
            upper_torque_acceleration: upper_torque,
            lower_torque_nominal: lower_torque,
            upper_torque_nominal: upper_torque,
            lower_force_acceleration: lower_force,
            upper_force_acceleration: upper_force,
            lower_force_nominal: lower_force,
            upper_force_nominal: upper_force,
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_range(
            "lower_torque_acceleration",
            &self.lower_torque_acceleration,
            "upper_torque_acceleration",
            &self.upper_torque_acceleration,
        )?;
        check_range(
            "lower_torque_nominal",
            &self.lower_torque_nominal,
            "upper_torque_nominal",
            &self.upper_torque_nominal,
        )?;
        check_range(
            "lower_force_acceleration",
            &self.lower_force_acceleration,
            "upper_force_acceleration",
            &self.upper_force_acceleration,
        )?;
        check_range(
            "lower_force_nominal",
            &self.lower_force_nominal,
            "upper_force_nominal",
            &self.upper_force_nominal,
        )
    }
}

fn check_range(
    lower_name: &'static str,
    lower: &[f64],
    upper_name: &'static str,
    upper: &[f64],
) -> Result<(), ProtocolError> {
    check_non_negative(lower_name, lower)?;
    check_non_negative(upper_name, upper)?;
    match lower.iter().zip(upper).position(|(lo, hi)| lo > hi) {
        Some(index) => Err(ProtocolError::InvalidParameter {
            param: lower_name,
            reason: format!(
                "element {} exceeds {} ({} > {})",
                index, upper_name, lower[index], upper[index]
            ),
        }),
        None => Ok(()),
    }
}

/// 末端负载参数
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadParameters {
    /// 质量（kg）
    pub mass: f64,
    /// 质心在法兰坐标系中的位置（m）
    pub f_x_cload: [f64; 3],
    /// 绕质心的惯量张量（列主序 3x3, kg·m²）
    pub inertia: [f64; 9],
}

impl LoadParameters {
    /// 卸载（零负载）
    pub fn none() -> Self {
        Self {
            mass: 0.0,
            f_x_cload: [0.0; 3],
            inertia: [0.0; 9],
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_non_negative("mass", &[self.mass])?;
        check_finite("f_x_cload", &self.f_x_cload)?;
        check_finite("inertia", &self.inertia)?;
        if !is_symmetric(&self.inertia) {
            return Err(ProtocolError::InvalidParameter {
                param: "inertia",
                reason: "inertia tensor must be symmetric".to_string(),
            });
        }
        Ok(())
    }
}

/// 配置请求
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigRequest {
    SetControllerMode(ControllerMode),
    SetCollisionBehavior(CollisionThresholds),
    /// 关节刚度（Nm/rad）
    SetJointImpedance([f64; JOINT_COUNT]),
    /// 笛卡尔刚度（N/m, Nm/rad）
    SetCartesianImpedance([f64; CARTESIAN_DOF]),
    /// 手动引导时允许移动的轴 `[x, y, z, rx, ry, rz]` 及肘部
    SetGuidingMode {
        axes: [bool; CARTESIAN_DOF],
        elbow: bool,
    },
    /// 末端 → 刚度坐标系
    SetEeToK([f64; 16]),
    /// 法兰 → 末端
    SetFToEe([f64; 16]),
    SetLoad(LoadParameters),
    /// 查询虚拟墙（笛卡尔限位）
    GetCartesianLimit(i32),
    AutomaticErrorRecovery,
}

impl ConfigRequest {
    /// 命令名（日志与错误信息使用）
    pub fn name(&self) -> &'static str {
        match self {
            ConfigRequest::SetControllerMode(_) => "SetControllerMode",
            ConfigRequest::SetCollisionBehavior(_) => "SetCollisionBehavior",
            ConfigRequest::SetJointImpedance(_) => "SetJointImpedance",
            ConfigRequest::SetCartesianImpedance(_) => "SetCartesianImpedance",
            ConfigRequest::SetGuidingMode { .. } => "SetGuidingMode",
            ConfigRequest::SetEeToK(_) => "SetEeToK",
            ConfigRequest::SetFToEe(_) => "SetFToEe",
            ConfigRequest::SetLoad(_) => "SetLoad",
            ConfigRequest::GetCartesianLimit(_) => "GetCartesianLimit",
            ConfigRequest::AutomaticErrorRecovery => "AutomaticErrorRecovery",
        }
    }

    /// 本地参数检查
    ///
    /// 失败时不应发送该请求；越界参数不做钳位。
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ConfigRequest::SetCollisionBehavior(thresholds) => thresholds.validate(),
            ConfigRequest::SetJointImpedance(k_theta) => check_non_negative("k_theta", k_theta),
            ConfigRequest::SetCartesianImpedance(k_x) => check_non_negative("k_x", k_x),
            ConfigRequest::SetEeToK(ee_t_k) => check_transform("ee_t_k", ee_t_k),
            ConfigRequest::SetFToEe(f_t_ee) => check_transform("f_t_ee", f_t_ee),
            ConfigRequest::SetLoad(load) => load.validate(),
            ConfigRequest::GetCartesianLimit(id) if *id < 0 => {
                Err(ProtocolError::InvalidParameter {
                    param: "id",
                    reason: format!("virtual wall id must be >= 0, got {}", id),
                })
            },
            ConfigRequest::SetControllerMode(_)
            | ConfigRequest::SetGuidingMode { .. }
            | ConfigRequest::GetCartesianLimit(_)
            | ConfigRequest::AutomaticErrorRecovery => Ok(()),
        }
    }
}

/// 虚拟墙（长方体限位区域）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualWallCuboid {
    pub id: i32,
    pub active: bool,
    /// 长方体尺寸（m）
    pub object_world_size: [f64; 3],
    /// 长方体中心位姿（列主序）
    pub p_frame: [f64; 16],
}

/// 请求成功时的返回数据
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigReply {
    Done,
    VirtualWall(VirtualWallCuboid),
}

/// 控制器拒绝原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("command not possible: {0}")]
    CommandNotPossible(String),
    #[error("aborted: {0}")]
    Aborted(String),
    #[error("preempted by another command")]
    Preempted,
}

/// 控制器对配置请求的响应
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigResponse {
    Success(ConfigReply),
    Rejected(RejectReason),
}
