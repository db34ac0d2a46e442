//! 进程内模拟控制器
//!
//! [`LoopbackChannel`] 在当前线程中扮演机器人控制器：
//! 每次 `receive_state` 产生一个新状态并推进 1 个控制周期，
//! `send_command` 把命令作用到下一个状态上。
//!
//! [`LoopbackHandle`] 可以克隆并跨线程使用，用于注入故障
//! （模式切换、接收超时、报文损坏、发送失败、请求被拒）并检查已发送的命令。
//! 注入在通道的下一次操作开始时生效。

use crate::{Channel, TransportError};
use crossbeam_channel::{Receiver, Sender};
use fci_protocol::{
    ConfigReply, ConfigRequest, ConfigResponse, IDENTITY_TRANSFORM, MotionGeneratorMode,
    RejectReason, ReportedControllerMode, RobotCommand, RobotMode, RobotState, VirtualWallCuboid,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 模拟控制器的协议版本
pub const LOOPBACK_SERVER_VERSION: u16 = 5;

/// 模拟控制器配置
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// 控制周期（机器人时钟每次接收推进的时间）
    pub period: Duration,
    /// 是否按墙钟时间节拍（spin_sleep），测试中通常关闭
    pub pace: bool,
    /// 初始状态
    pub initial_state: RobotState,
    /// 上报的协议版本
    pub server_version: u16,
    /// 预置的虚拟墙
    pub virtual_walls: Vec<VirtualWallCuboid>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1),
            pace: false,
            initial_state: RobotState::default(),
            server_version: LOOPBACK_SERVER_VERSION,
            virtual_walls: Vec::new(),
        }
    }
}

impl LoopbackConfig {
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_pacing(mut self, pace: bool) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_initial_state(mut self, state: RobotState) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_virtual_wall(mut self, wall: VirtualWallCuboid) -> Self {
        self.virtual_walls.push(wall);
        self
    }
}

/// 可注入的故障/事件
#[derive(Debug, Clone, PartialEq)]
pub enum Injection {
    /// 控制器切换到指定模式（下一个状态即上报该模式）
    ControllerModeChange(ReportedControllerMode),
    /// 机器人运行模式变化（如反射）
    RobotMode(RobotMode),
    /// 下一次接收超时
    ReceiveTimeout,
    /// 下一次接收得到损坏的报文
    MalformedState,
    /// 下一次发送失败
    SendFailure,
    /// 下一条配置请求被拒绝
    Reject(RejectReason),
    /// 关闭通道，之后的所有操作返回 [`TransportError::Closed`]
    Close,
}

/// 通道与句柄共享的记录
#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<RobotCommand>>,
    requests: Mutex<Vec<ConfigRequest>>,
    states_produced: AtomicU64,
}

/// 模拟控制器通道
pub struct LoopbackChannel {
    config: LoopbackConfig,
    state: RobotState,
    injections: Receiver<Injection>,
    shared: Arc<Shared>,
    pending_timeouts: u32,
    pending_malformed: u32,
    pending_send_failures: u32,
    pending_rejections: VecDeque<RejectReason>,
    virtual_walls: HashMap<i32, VirtualWallCuboid>,
    next_tick: Option<Instant>,
    closed: bool,
}

/// 模拟控制器的外部句柄（可克隆、可跨线程）
#[derive(Clone)]
pub struct LoopbackHandle {
    injections: Sender<Injection>,
    shared: Arc<Shared>,
}

impl LoopbackChannel {
    /// 创建通道与对应的句柄
    pub fn new(config: LoopbackConfig) -> (Self, LoopbackHandle) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared::default());
        let virtual_walls = config.virtual_walls.iter().map(|wall| (wall.id, *wall)).collect();

        let channel = Self {
            state: config.initial_state.clone(),
            config,
            injections: rx,
            shared: shared.clone(),
            pending_timeouts: 0,
            pending_malformed: 0,
            pending_send_failures: 0,
            pending_rejections: VecDeque::new(),
            virtual_walls,
            next_tick: None,
            closed: false,
        };
        let handle = LoopbackHandle {
            injections: tx,
            shared,
        };
        (channel, handle)
    }

    /// 当前（尚未发出的）内部状态
    pub fn state(&self) -> &RobotState {
        &self.state
    }

    fn drain_injections(&mut self) {
        for injection in self.injections.try_iter() {
            debug!("Loopback injection: {:?}", injection);
            match injection {
                Injection::ControllerModeChange(mode) => self.state.controller_mode = mode,
                Injection::RobotMode(mode) => self.state.robot_mode = mode,
                Injection::ReceiveTimeout => self.pending_timeouts += 1,
                Injection::MalformedState => self.pending_malformed += 1,
                Injection::SendFailure => self.pending_send_failures += 1,
                Injection::Reject(reason) => self.pending_rejections.push_back(reason),
                Injection::Close => self.closed = true,
            }
        }
    }

    fn pace(&mut self) {
        if !self.config.pace {
            return;
        }
        let now = Instant::now();
        match self.next_tick {
            Some(tick) if tick > now => spin_sleep::sleep(tick - now),
            _ => {},
        }
        let base = self.next_tick.map_or(now, |tick| tick.max(now));
        self.next_tick = Some(base + self.config.period);
    }

    fn apply_command(&mut self, command: &RobotCommand) {
        let dt = self.config.period.as_secs_f64();
        let state = &mut self.state;

        if let Some(control) = &command.control {
            state.tau_j_d = control.tau_j_d;
            state.tau_j = control.tau_j_d;
        }

        if let Some(motion) = &command.motion {
            match motion.mode {
                MotionGeneratorMode::JointPosition => {
                    for i in 0..state.q.len() {
                        state.dq[i] = (motion.q_c[i] - state.q[i]) / dt;
                    }
                    state.q_d = motion.q_c;
                    state.q = motion.q_c;
                },
                MotionGeneratorMode::JointVelocity => {
                    for i in 0..state.q.len() {
                        state.q[i] += motion.dq_c[i] * dt;
                    }
                    state.dq_d = motion.dq_c;
                    state.dq = motion.dq_c;
                    state.q_d = state.q;
                },
                MotionGeneratorMode::CartesianPosition => {
                    state.o_t_ee_d = motion.o_t_ee_c;
                    state.o_t_ee = motion.o_t_ee_c;
                },
                MotionGeneratorMode::CartesianVelocity => {
                    for axis in 0..3 {
                        state.o_t_ee[12 + axis] += motion.o_dp_ee_c[axis] * dt;
                    }
                    state.o_t_ee_d = state.o_t_ee;
                },
                MotionGeneratorMode::Idle => {},
            }
            if motion.valid_elbow {
                state.elbow_d = motion.elbow_c;
                state.elbow = motion.elbow_c;
            }
            state.motion_generator_mode = motion.mode;
            state.robot_mode = RobotMode::Move;
        }

        state.control_command_success_rate = 1.0;

        if command.last_cycle {
            state.motion_generator_mode = MotionGeneratorMode::Idle;
            state.dq = [0.0; 7];
            if state.robot_mode == RobotMode::Move {
                state.robot_mode = RobotMode::Idle;
            }
        }
    }

    fn handle_request(&mut self, request: &ConfigRequest) -> ConfigResponse {
        if let Some(reason) = self.pending_rejections.pop_front() {
            return ConfigResponse::Rejected(reason);
        }
        if let Err(e) = request.validate() {
            return ConfigResponse::Rejected(RejectReason::InvalidArgument(e.to_string()));
        }

        match request {
            ConfigRequest::SetControllerMode(mode) => {
                self.state.controller_mode = mode.reported();
            },
            ConfigRequest::SetEeToK(ee_t_k) => self.state.ee_t_k = *ee_t_k,
            ConfigRequest::SetFToEe(f_t_ee) => self.state.f_t_ee = *f_t_ee,
            ConfigRequest::AutomaticErrorRecovery => {
                if !self.state.requires_recovery() {
                    return ConfigResponse::Rejected(RejectReason::CommandNotPossible(
                        "robot is not in reflex mode".to_string(),
                    ));
                }
                self.state.robot_mode = RobotMode::Idle;
            },
            ConfigRequest::GetCartesianLimit(id) => {
                let wall = self.virtual_walls.get(id).copied().unwrap_or(VirtualWallCuboid {
                    id: *id,
                    active: false,
                    object_world_size: [0.0; 3],
                    p_frame: IDENTITY_TRANSFORM,
                });
                return ConfigResponse::Success(ConfigReply::VirtualWall(wall));
            },
            ConfigRequest::SetCollisionBehavior(_)
            | ConfigRequest::SetJointImpedance(_)
            | ConfigRequest::SetCartesianImpedance(_)
            | ConfigRequest::SetGuidingMode { .. }
            | ConfigRequest::SetLoad(_) => {},
        }
        ConfigResponse::Success(ConfigReply::Done)
    }
}

impl Channel for LoopbackChannel {
    fn receive_state(&mut self, timeout: Duration) -> Result<RobotState, TransportError> {
        self.drain_injections();
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.pending_timeouts > 0 {
            self.pending_timeouts -= 1;
            return Err(TransportError::Timeout(timeout));
        }
        if self.pending_malformed > 0 {
            self.pending_malformed -= 1;
            return Err(TransportError::Malformed(
                "state message size mismatch".to_string(),
            ));
        }

        self.pace();
        self.state.message_id += 1;
        self.state.time += self.config.period;
        self.shared.states_produced.fetch_add(1, Ordering::Relaxed);
        trace!("Loopback produced state #{}", self.state.message_id);
        Ok(self.state.clone())
    }

    fn send_command(&mut self, command: RobotCommand) -> Result<(), TransportError> {
        self.drain_injections();
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.pending_send_failures > 0 {
            self.pending_send_failures -= 1;
            return Err(TransportError::Send("injected send failure".to_string()));
        }

        self.apply_command(&command);
        self.shared.sent.lock().push(command);
        Ok(())
    }

    fn request(
        &mut self,
        request: &ConfigRequest,
        _timeout: Duration,
    ) -> Result<ConfigResponse, TransportError> {
        self.drain_injections();
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.shared.requests.lock().push(request.clone());
        let response = self.handle_request(request);
        debug!("Loopback request {} -> {:?}", request.name(), response);
        Ok(response)
    }

    fn server_version(&self) -> u16 {
        self.config.server_version
    }
}

impl LoopbackHandle {
    /// 注入事件（通道已销毁时静默忽略）
    pub fn inject(&self, injection: Injection) {
        let _ = self.injections.send(injection);
    }

    pub fn change_controller_mode(&self, mode: ReportedControllerMode) {
        self.inject(Injection::ControllerModeChange(mode));
    }

    pub fn timeout_next_receive(&self) {
        self.inject(Injection::ReceiveTimeout);
    }

    pub fn reject_next_request(&self, reason: RejectReason) {
        self.inject(Injection::Reject(reason));
    }

    /// 已发送命令的副本
    pub fn sent_commands(&self) -> Vec<RobotCommand> {
        self.shared.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.shared.sent.lock().len()
    }

    /// 已收到的配置请求
    pub fn requests(&self) -> Vec<ConfigRequest> {
        self.shared.requests.lock().clone()
    }

    /// 已产生的状态数量
    pub fn states_produced(&self) -> u64 {
        self.shared.states_produced.load(Ordering::Relaxed)
    }
}
