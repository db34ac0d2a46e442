//! 机器人句柄
//!
//! [`Robot`] 是用户使用的入口：
//! - 周期会话：`control_torques`、`control_torques_with_motion`、`control_motion`、
//!   `read`、`read_with_mode`、`read_once`
//! - 配置命令：`execute` 及 `set_*` 便捷方法
//! - 无锁观测：`latest_state`、`observer`、`metrics`
//!
//! 会话与配置命令共用同一个会话锁，已有会话时立即返回 [`RobotError::SessionBusy`]。
//! `Robot` 是 `Sync` 的，可以在多个线程间共享引用。
//!
//! # 示例
//!
//! ```rust,no_run
//! use fci_client::{Flow, Robot, RobotConfig};
//! use fci_protocol::Torques;
//! # fn channel() -> Box<dyn fci_transport::Channel> { unimplemented!() }
//!
//! let robot = Robot::connect(channel(), RobotConfig::default())?;
//! let mut time = 0.0;
//! robot.control_torques(|_state, period| {
//!     time += period.as_secs_f64();
//!     let torques = Torques::zero();
//!     Ok(if time >= 5.0 { Flow::Finished(torques) } else { Flow::Continue(torques) })
//! })?;
//! # Ok::<(), fci_client::RobotError>(())
//! ```

use crate::control::control_loop::ControlLoop;
use crate::control::read_loop::run_read_loop;
use crate::control::{CallbackResult, ControllerModeMachine, NoMotion};
use crate::session::{Session, SessionGuard, SessionKind};
use crate::{RobotConfig, RobotError, dispatcher};
use fci_driver::{DriverError, MetricsSnapshot, StateObserver, apply_realtime};
use fci_protocol::{
    CARTESIAN_DOF, CollisionThresholds, ConfigReply, ConfigRequest, ControllerMode, JOINT_COUNT,
    LoadParameters, MotionTarget, RobotState, Torques, VirtualWallCuboid,
};
use fci_transport::Channel;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 机器人句柄
pub struct Robot {
    guard: SessionGuard,
    observer: StateObserver,
    config: RobotConfig,
    server_version: u16,
}

impl Robot {
    /// 接管通道并创建句柄
    pub fn connect(channel: impl Channel + 'static, config: RobotConfig) -> Result<Self, RobotError> {
        config.validate()?;
        let driver = fci_driver::Driver::new(channel, config.driver.clone())?;
        let observer = driver.observer();
        let server_version = driver.server_version();
        info!("Robot connected (server version {})", server_version);

        Ok(Self {
            guard: SessionGuard::new(driver),
            observer,
            config,
            server_version,
        })
    }

    // ==================== 周期会话 ====================

    /// 纯力矩控制
    ///
    /// 回调返回 `Flow::Finished` 后再发送一条终止命令，然后返回。
    pub fn control_torques<F>(&self, mut torque: F) -> Result<(), RobotError>
    where
        F: FnMut(&RobotState, Duration) -> CallbackResult<Torques>,
    {
        let mut session = self.start_control(SessionKind::Control)?;
        let result = ControlLoop::<NoMotion>::new(&mut session, self.implied_mode())
            .run(Some(&mut torque), None);
        self.finish(&session, result)
    }

    /// 力矩 + 运动生成器
    ///
    /// 控制器模式由力矩控制隐含，不单独请求。两个回调都结束后才发送终止命令。
    pub fn control_torques_with_motion<M, F, G>(
        &self,
        mut torque: F,
        mut motion: G,
    ) -> Result<(), RobotError>
    where
        M: MotionTarget,
        F: FnMut(&RobotState, Duration) -> CallbackResult<Torques>,
        G: FnMut(&RobotState, Duration) -> CallbackResult<M>,
    {
        let mut session = self.start_control(SessionKind::Control)?;
        let result = ControlLoop::<M>::new(&mut session, self.implied_mode())
            .run(Some(&mut torque), Some(&mut motion));
        self.finish(&session, result)
    }

    /// 运动生成器 + 控制器模式
    ///
    /// 先发送设置控制器模式的命令，之后每个周期都检查上报的模式。
    pub fn control_motion<M, G>(&self, mut motion: G, mode: ControllerMode) -> Result<(), RobotError>
    where
        M: MotionTarget,
        G: FnMut(&RobotState, Duration) -> CallbackResult<M>,
    {
        let mut session = self.start_control(SessionKind::Motion)?;
        dispatcher::execute(&mut session, &ConfigRequest::SetControllerMode(mode))?;
        let result = ControlLoop::<M>::new(&mut session, ControllerModeMachine::requested(mode))
            .run(None, Some(&mut motion));
        self.finish(&session, result)
    }

    /// 读取循环，谓词返回 `false` 时结束
    pub fn read<P>(&self, mut predicate: P) -> Result<(), RobotError>
    where
        P: FnMut(&RobotState) -> bool,
    {
        let mut session = self.guard.try_acquire(SessionKind::Read)?;
        let result =
            run_read_loop(&mut session, ControllerModeMachine::unenforced(), &mut predicate);
        self.finish(&session, result)
    }

    /// 设置控制器模式后读取，每周期检查模式
    pub fn read_with_mode<P>(&self, mode: ControllerMode, mut predicate: P) -> Result<(), RobotError>
    where
        P: FnMut(&RobotState) -> bool,
    {
        let mut session = self.guard.try_acquire(SessionKind::Read)?;
        dispatcher::execute(&mut session, &ConfigRequest::SetControllerMode(mode))?;
        let result =
            run_read_loop(&mut session, ControllerModeMachine::requested(mode), &mut predicate);
        self.finish(&session, result)
    }

    /// 读取单个状态
    pub fn read_once(&self) -> Result<RobotState, RobotError> {
        let mut session = self.guard.try_acquire(SessionKind::ReadOnce)?;
        Ok(session.driver().read_once()?)
    }

    // ==================== 配置命令 ====================

    /// 执行配置命令
    pub fn execute(&self, request: ConfigRequest) -> Result<ConfigReply, RobotError> {
        let mut session = self.guard.try_acquire(SessionKind::Command)?;
        dispatcher::execute(&mut session, &request)
    }

    pub fn set_collision_behavior(&self, thresholds: CollisionThresholds) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::SetCollisionBehavior(thresholds))
    }

    /// 加速与匀速阶段使用同一组阈值
    pub fn set_collision_behavior_uniform(
        &self,
        lower_torque: [f64; JOINT_COUNT],
        upper_torque: [f64; JOINT_COUNT],
        lower_force: [f64; CARTESIAN_DOF],
        upper_force: [f64; CARTESIAN_DOF],
    ) -> Result<(), RobotError> {
        self.set_collision_behavior(CollisionThresholds::uniform(
            lower_torque,
            upper_torque,
            lower_force,
            upper_force,
        ))
    }

    pub fn set_joint_impedance(&self, k_theta: [f64; JOINT_COUNT]) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::SetJointImpedance(k_theta))
    }

    pub fn set_cartesian_impedance(&self, k_x: [f64; CARTESIAN_DOF]) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::SetCartesianImpedance(k_x))
    }

    pub fn set_guiding_mode(&self, axes: [bool; CARTESIAN_DOF], elbow: bool) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::SetGuidingMode { axes, elbow })
    }

    /// 设置末端 → 刚度坐标系变换
    pub fn set_k(&self, ee_t_k: [f64; 16]) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::SetEeToK(ee_t_k))
    }

    /// 设置法兰 → 末端变换
    pub fn set_ee(&self, f_t_ee: [f64; 16]) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::SetFToEe(f_t_ee))
    }

    pub fn set_load(&self, load: LoadParameters) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::SetLoad(load))
    }

    /// 查询虚拟墙
    pub fn virtual_wall(&self, id: i32) -> Result<VirtualWallCuboid, RobotError> {
        match self.execute(ConfigRequest::GetCartesianLimit(id))? {
            ConfigReply::VirtualWall(wall) => Ok(wall),
            ConfigReply::Done => Err(DriverError::UnexpectedReply {
                command: "GetCartesianLimit",
            }
            .into()),
        }
    }

    /// 反射后自动恢复
    pub fn automatic_error_recovery(&self) -> Result<(), RobotError> {
        self.execute_done(ConfigRequest::AutomaticErrorRecovery)
    }

    // ==================== 观测 ====================

    /// 控制器协议版本
    pub fn server_version(&self) -> u16 {
        self.server_version
    }

    /// 最近一次收到的状态（不获取会话锁）
    pub fn latest_state(&self) -> Option<Arc<RobotState>> {
        self.observer.latest()
    }

    pub fn observer(&self) -> StateObserver {
        self.observer.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.guard.metrics().snapshot()
    }

    /// 是否有会话或配置命令正在运行
    pub fn is_session_active(&self) -> bool {
        self.guard.is_held()
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    // ==================== 内部 ====================

    fn start_control(&self, kind: SessionKind) -> Result<Session<'_>, RobotError> {
        let session = self.guard.try_acquire(kind)?;
        apply_realtime(self.config.realtime)?;
        info!("Starting {} session", kind);
        Ok(session)
    }

    fn implied_mode(&self) -> ControllerModeMachine {
        if self.config.enforce_implied_mode {
            ControllerModeMachine::implied()
        } else {
            ControllerModeMachine::unenforced()
        }
    }

    fn finish(&self, session: &Session<'_>, result: Result<u64, RobotError>) -> Result<(), RobotError> {
        match result {
            Ok(cycles) => {
                info!("{} session finished after {} cycles", session.kind(), cycles);
                Ok(())
            },
            Err(e) => {
                warn!("{} session aborted: {}", session.kind(), e);
                Err(e)
            },
        }
    }

    fn execute_done(&self, request: ConfigRequest) -> Result<(), RobotError> {
        self.execute(request).map(|_| ())
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("server_version", &self.server_version)
            .field("session_active", &self.is_session_active())
            .finish_non_exhaustive()
    }
}
