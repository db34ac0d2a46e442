//! 机器人状态快照
//!
//! 控制器每个控制周期（默认 1ms）发送一次 [`RobotState`]。
//! 状态在周期内只读，回调消费后即丢弃，不跨周期持有。

use crate::{IDENTITY_TRANSFORM, JOINT_COUNT};
use std::time::Duration;

/// 控制器上报的控制器模式
///
/// 与 [`ControllerMode`](crate::ControllerMode)（可请求的模式）不同，
/// 上报值还包含外部力矩控制和未知模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ReportedControllerMode {
    /// 关节阻抗控制
    JointImpedance = 0x00,
    /// 笛卡尔阻抗控制
    CartesianImpedance = 0x01,
    /// 外部控制器（用户下发力矩）
    ExternalController = 0x02,
    /// 其他/未知
    #[default]
    Other = 0x03,
}

/// 机器人运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RobotMode {
    #[default]
    Other = 0x00,
    Idle = 0x01,
    Move = 0x02,
    Guiding = 0x03,
    /// 反射（碰撞等安全响应）
    Reflex = 0x04,
    UserStopped = 0x05,
    AutomaticErrorRecovery = 0x06,
}

/// 控制器当前执行的运动生成器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MotionGeneratorMode {
    #[default]
    Idle = 0x00,
    JointPosition = 0x01,
    JointVelocity = 0x02,
    CartesianPosition = 0x03,
    CartesianVelocity = 0x04,
}

/// 机器人状态（每周期一份）
///
/// 命名沿用控制器侧约定：
/// - `q`/`dq`: 关节位置/速度（rad, rad/s）
/// - `tau_j`: 关节力矩（Nm），`_d` 后缀表示期望值
/// - `o_t_ee`: 基座系到末端的齐次变换（列主序）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    /// 控制器消息序号（单调递增）
    pub message_id: u64,
    /// 控制器时钟
    pub time: Duration,

    /// 基座 → 末端（测量值）
    pub o_t_ee: [f64; 16],
    /// 基座 → 末端（期望值）
    pub o_t_ee_d: [f64; 16],
    /// 法兰 → 末端
    pub f_t_ee: [f64; 16],
    /// 末端 → 刚度坐标系
    pub ee_t_k: [f64; 16],
    /// 肘部构型（测量值）
    pub elbow: [f64; 2],
    /// 肘部构型（期望值）
    pub elbow_d: [f64; 2],

    pub q: [f64; JOINT_COUNT],
    pub q_d: [f64; JOINT_COUNT],
    pub dq: [f64; JOINT_COUNT],
    pub dq_d: [f64; JOINT_COUNT],
    pub tau_j: [f64; JOINT_COUNT],
    pub tau_j_d: [f64; JOINT_COUNT],
    pub dtau_j: [f64; JOINT_COUNT],
    /// 外力矩估计（滤波后）
    pub tau_ext_hat_filtered: [f64; JOINT_COUNT],
    /// 刚度坐标系下的外力/力矩估计
    pub o_f_ext_hat_k: [f64; 6],

    pub controller_mode: ReportedControllerMode,
    pub robot_mode: RobotMode,
    pub motion_generator_mode: MotionGeneratorMode,

    /// 最近一段时间内控制命令的成功接收率（0.0 - 1.0）
    pub control_command_success_rate: f64,
}

impl Default for RobotState {
    fn default() -> Self {
        Self {
            message_id: 0,
            time: Duration::ZERO,
            o_t_ee: IDENTITY_TRANSFORM,
            o_t_ee_d: IDENTITY_TRANSFORM,
            f_t_ee: IDENTITY_TRANSFORM,
            ee_t_k: IDENTITY_TRANSFORM,
            elbow: [0.0; 2],
            elbow_d: [0.0; 2],
            q: [0.0; JOINT_COUNT],
            q_d: [0.0; JOINT_COUNT],
            dq: [0.0; JOINT_COUNT],
            dq_d: [0.0; JOINT_COUNT],
            tau_j: [0.0; JOINT_COUNT],
            tau_j_d: [0.0; JOINT_COUNT],
            dtau_j: [0.0; JOINT_COUNT],
            tau_ext_hat_filtered: [0.0; JOINT_COUNT],
            o_f_ext_hat_k: [0.0; 6],
            controller_mode: ReportedControllerMode::Other,
            robot_mode: RobotMode::Idle,
            motion_generator_mode: MotionGeneratorMode::Idle,
            control_command_success_rate: 0.0,
        }
    }
}

impl RobotState {
    /// 末端位置（平移分量）
    pub fn ee_position(&self) -> [f64; 3] {
        [self.o_t_ee[12], self.o_t_ee[13], self.o_t_ee[14]]
    }

    /// 是否处于反射/用户急停等需要恢复的模式
    pub fn requires_recovery(&self) -> bool {
        matches!(self.robot_mode, RobotMode::Reflex | RobotMode::UserStopped)
    }
}
