//! 会话集成测试
//!
//! 覆盖：
//! 1. 终止周期（回调结束后多发一条 last_cycle 命令）
//! 2. 故障立即终止（超时、发送失败、报文损坏、通道关闭、NaN、回调错误、模式变化）
//! 3. 会话独占与释放
//! 4. 回调收到的周期时长

mod common;

use common::{PERIOD, ScriptedChannel, Step, finish_after, test_config};
use fci_protocol::{JointVelocities, ReportedControllerMode};
use fci_sdk::prelude::*;
use fci_transport::{Injection, LoopbackChannel, LoopbackConfig};
use proptest::prelude::*;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn scripted(script: Vec<Step>) -> (Robot, common::ScriptHandle) {
    let (channel, handle) = ScriptedChannel::new(script);
    (Robot::connect(channel, test_config()).unwrap(), handle)
}

fn loopback() -> (Robot, fci_transport::LoopbackHandle) {
    let (channel, handle) = LoopbackChannel::new(LoopbackConfig::default());
    (Robot::connect(channel, test_config()).unwrap(), handle)
}

fn assert_released(robot: &Robot) {
    let metrics = robot.metrics();
    assert!(!robot.is_session_active());
    assert_eq!(metrics.sessions_started, metrics.sessions_released);
    assert_eq!(metrics.active_sessions(), 0);
}

// ==================== 终止周期 ====================

#[test]
fn test_torque_session_sends_terminal_command() {
    let (robot, handle) = scripted(vec![]);

    let mut calls = 0;
    robot
        .control_torques(|_, _| {
            calls += 1;
            let torques = Torques::new([0.5 * calls as f64; 7]);
            Ok(if calls == 3 {
                Flow::Finished(torques)
            } else {
                Flow::Continue(torques)
            })
        })
        .unwrap();

    assert_eq!(calls, 3);
    let sent = handle.sent();
    assert_eq!(sent.len(), 4);
    assert_eq!(
        sent.iter().map(|c| c.message_id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(
        sent.iter().map(|c| c.motion_finished).collect::<Vec<_>>(),
        vec![false, false, true, true]
    );
    assert_eq!(
        sent.iter().map(|c| c.last_cycle).collect::<Vec<_>>(),
        vec![false, false, false, true]
    );
    assert_eq!(sent[3].control.unwrap().tau_j_d, [1.5; 7]);
    assert_released(&robot);
}

#[test]
fn test_torque_and_motion_wait_for_both() {
    let (robot, handle) = loopback();

    let mut motion_calls = 0;
    robot
        .control_torques_with_motion(finish_after(5, Torques::zero()), |_, _| {
            motion_calls += 1;
            Ok(if motion_calls == 2 {
                Flow::Finished(JointVelocities::new([0.0; 7]))
            } else {
                Flow::Continue(JointVelocities::new([0.01; 7]))
            })
        })
        .unwrap();

    assert_eq!(motion_calls, 2);
    let sent = handle.sent_commands();
    assert_eq!(sent.len(), 6);
    assert!(sent[5].last_cycle);
    assert!(sent.iter().all(|c| c.control.is_some() && c.motion.is_some()));
    assert_eq!(sent[4].motion.unwrap().dq_c, [0.0; 7]);
}

#[test]
fn test_random_session_lengths() {
    let mut rng = rand::thread_rng();
    for _ in 0..10 {
        let n: usize = rng.gen_range(1..200);
        let (robot, handle) = loopback();
        robot.control_torques(finish_after(n, Torques::zero())).unwrap();

        assert_eq!(handle.sent_count(), n + 1);
        let metrics = robot.metrics();
        assert_eq!(metrics.commands_sent, n as u64 + 1);
        assert_eq!(metrics.states_received, n as u64 + 1);
    }
}

// ==================== 故障终止 ====================

#[test]
fn test_timeout_at_cycle_five() {
    let script = vec![
        Step::State(None),
        Step::State(None),
        Step::State(None),
        Step::State(None),
        Step::Timeout,
    ];
    let (robot, handle) = scripted(script);

    let mut calls = 0;
    let err = robot
        .control_torques(|_, _| {
            calls += 1;
            Ok(Flow::Continue(Torques::zero()))
        })
        .unwrap_err();

    assert!(matches!(err, RobotError::Communication(ref e) if e.is_timeout()));
    assert!(err.is_retryable());
    assert_eq!(calls, 4);
    assert_eq!(handle.sent_count(), 4);
    assert!(handle.sent().iter().all(|c| !c.last_cycle));
    assert_eq!(robot.metrics().receive_timeouts, 1);
    assert_released(&robot);
}

#[test]
fn test_nan_aborts_before_send() {
    let (robot, handle) = scripted(vec![]);

    let mut calls = 0;
    let err = robot
        .control_torques(|_, _| {
            calls += 1;
            let mut tau = [0.1; 7];
            if calls == 3 {
                tau[6] = f64::INFINITY;
            }
            Ok(Flow::Continue(Torques::new(tau)))
        })
        .unwrap_err();

    match err {
        RobotError::Numeric(ref fault) => assert_eq!(fault.cycle, 3),
        ref other => panic!("Expected Numeric, got {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::Numeric);
    assert_eq!(handle.sent_count(), 2);
    assert_released(&robot);
}

#[test]
fn test_invalid_motion_target_aborts() {
    let (robot, handle) = loopback();

    let mut pose = CartesianPose::new([0.0; 16]);
    pose.o_t_ee[0] = 2.0;
    let err = robot
        .control_motion(finish_after(3, pose), ControllerMode::CartesianImpedance)
        .unwrap_err();

    assert!(matches!(err, RobotError::Numeric(_)));
    assert_eq!(handle.sent_count(), 0);
}

#[test]
fn test_callback_error_propagates() {
    let (robot, handle) = scripted(vec![]);

    let mut calls = 0;
    let err = robot
        .control_torques(|_, _| {
            calls += 1;
            if calls == 2 {
                return Err("planner diverged".into());
            }
            Ok(Flow::Continue(Torques::zero()))
        })
        .unwrap_err();

    match err {
        RobotError::Callback(e) => assert_eq!(e.to_string(), "planner diverged"),
        other => panic!("Expected Callback, got {:?}", other),
    }
    assert_eq!(handle.sent_count(), 1);
    assert_released(&robot);
}

#[test]
fn test_guard_released_on_every_exit_path() {
    let (robot, handle) = loopback();

    robot.control_torques(finish_after(2, Torques::zero())).unwrap();
    robot.read(|state| state.message_id < 5).unwrap();
    robot.read_once().unwrap();

    handle.timeout_next_receive();
    assert!(robot.control_torques(finish_after(2, Torques::zero())).is_err());

    handle.reject_next_request(fci_protocol::RejectReason::Preempted);
    assert!(robot.set_joint_impedance([100.0; 7]).is_err());

    assert!(robot.set_cartesian_impedance([f64::NAN; 6]).is_err());

    assert!(
        robot
            .control_torques(|_, _| -> CallbackResult<Torques> { Err("stop".into()) })
            .is_err()
    );

    let metrics = robot.metrics();
    assert_eq!(metrics.sessions_started, 7);
    assert_released(&robot);

    // 释放后可以立即开始新会话
    robot.control_torques(finish_after(1, Torques::zero())).unwrap();
}

#[test]
fn test_send_failure_ends_torque_session() {
    let (robot, handle) = loopback();

    let mut calls = 0;
    let err = robot
        .control_torques(|_, _| {
            calls += 1;
            if calls == 3 {
                handle.inject(Injection::SendFailure);
            }
            Ok(Flow::Continue(Torques::zero()))
        })
        .unwrap_err();

    assert!(matches!(
        err,
        RobotError::Communication(DriverError::Transport(TransportError::Send(_)))
    ));
    assert_eq!(err.kind(), ErrorKind::Communication);
    assert_eq!(calls, 3);
    assert_eq!(handle.sent_count(), 2);
    assert_eq!(robot.metrics().transport_errors, 1);
    assert_released(&robot);
}

#[test]
fn test_malformed_state_ends_motion_session() {
    let (robot, handle) = loopback();

    let mut calls = 0;
    let err = robot
        .control_motion(
            |_, _| {
                calls += 1;
                if calls == 3 {
                    handle.inject(Injection::MalformedState);
                }
                Ok(Flow::Continue(JointVelocities::new([0.0; 7])))
            },
            ControllerMode::JointImpedance,
        )
        .unwrap_err();

    assert!(matches!(
        err,
        RobotError::Communication(DriverError::Transport(TransportError::Malformed(_)))
    ));
    assert!(!err.is_retryable());
    assert_eq!(calls, 3);
    // 第 3 周期的命令在注入生效前已发送
    assert_eq!(handle.sent_count(), 3);
    assert_eq!(robot.metrics().transport_errors, 1);
    assert_released(&robot);
}

#[test]
fn test_closed_channel_ends_read_session() {
    let (robot, handle) = loopback();

    let mut seen = 0;
    let err = robot
        .read(|_| {
            seen += 1;
            if seen == 3 {
                handle.inject(Injection::Close);
            }
            true
        })
        .unwrap_err();

    assert!(matches!(
        err,
        RobotError::Communication(DriverError::Transport(TransportError::Closed))
    ));
    assert_eq!(seen, 3);
    assert_eq!(handle.sent_count(), 0);
    assert_eq!(robot.metrics().transport_errors, 1);
    assert_released(&robot);

    // 关闭后的后续操作同样以通信故障结束
    assert!(matches!(
        robot.read_once(),
        Err(RobotError::Communication(_))
    ));
    assert_released(&robot);
}

// ==================== 控制器模式 ====================

#[test]
fn test_controller_mode_round_trip() {
    let (robot, handle) = loopback();

    robot
        .control_motion(
            finish_after(3, JointPositions::new([0.0; 7])),
            ControllerMode::CartesianImpedance,
        )
        .unwrap();
    assert_eq!(
        robot.observer().controller_mode(),
        Some(ReportedControllerMode::CartesianImpedance)
    );

    let mut reads = 0;
    robot
        .read_with_mode(ControllerMode::JointImpedance, |state| {
            reads += 1;
            assert_eq!(state.controller_mode, ReportedControllerMode::JointImpedance);
            reads < 3
        })
        .unwrap();

    assert_eq!(
        handle.requests(),
        vec![
            ConfigRequest::SetControllerMode(ControllerMode::CartesianImpedance),
            ConfigRequest::SetControllerMode(ControllerMode::JointImpedance),
        ]
    );
}

#[test]
fn test_mode_mismatch_on_first_cycle() {
    let (channel, handle) = ScriptedChannel::with_mode(
        vec![Step::State(Some(ReportedControllerMode::CartesianImpedance))],
        ReportedControllerMode::JointImpedance,
    );
    let robot = Robot::connect(channel, test_config()).unwrap();

    let mut calls = 0;
    let err = robot
        .control_motion(
            |_, _| {
                calls += 1;
                Ok(Flow::Continue(JointVelocities::new([0.0; 7])))
            },
            ControllerMode::JointImpedance,
        )
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        RobotError::Control(ControlFault::ModeMismatch {
            expected: ReportedControllerMode::JointImpedance,
            reported: ReportedControllerMode::CartesianImpedance,
            cycle: 1,
        })
        .to_string()
    );
    assert_eq!(calls, 0);
    assert_eq!(handle.sent_count(), 0);
    assert_eq!(handle.requests().len(), 1);
    assert_eq!(robot.metrics().control_faults, 1);
}

#[test]
fn test_implied_mode_change_faults_torque_session() {
    let (robot, handle) = loopback();

    let mut calls = 0;
    let err = robot
        .control_torques(|_, _| {
            calls += 1;
            if calls == 4 {
                handle.change_controller_mode(ReportedControllerMode::CartesianImpedance);
            }
            Ok(Flow::Continue(Torques::zero()))
        })
        .unwrap_err();

    assert!(matches!(
        err,
        RobotError::Control(ControlFault::ModeMismatch { cycle: 5, .. })
    ));
    assert_eq!(handle.sent_count(), 4);
}

#[test]
fn test_implied_mode_not_enforced_when_disabled() {
    let (channel, handle) = LoopbackChannel::new(LoopbackConfig::default());
    let robot =
        Robot::connect(channel, test_config().with_implied_mode_enforcement(false)).unwrap();

    let mut calls = 0;
    robot
        .control_torques(|_, _| {
            calls += 1;
            if calls == 2 {
                handle.change_controller_mode(ReportedControllerMode::CartesianImpedance);
            }
            Ok(if calls == 5 {
                Flow::Finished(Torques::zero())
            } else {
                Flow::Continue(Torques::zero())
            })
        })
        .unwrap();
    assert_eq!(handle.sent_count(), 6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_mode_change_faults_at_cycle_k(k in 2u64..40) {
        let (robot, handle) = loopback();

        let mut calls = 0u64;
        let err = robot
            .control_motion(
                |_, _| {
                    calls += 1;
                    if calls == k - 1 {
                        handle.change_controller_mode(ReportedControllerMode::CartesianImpedance);
                    }
                    Ok(Flow::Continue(JointVelocities::new([0.0; 7])))
                },
                ControllerMode::JointImpedance,
            )
            .unwrap_err();

        let is_mismatch_at_k =
            matches!(err, RobotError::Control(ControlFault::ModeMismatch { cycle, .. }) if cycle == k);
        prop_assert!(is_mismatch_at_k);
        prop_assert_eq!(calls, k - 1);
        prop_assert_eq!(handle.sent_count() as u64, k - 1);
        prop_assert!(!robot.is_session_active());
    }
}

// ==================== 周期时长 ====================

#[test]
fn test_periods_follow_robot_clock() {
    let times = [10u64, 11, 13, 14, 20];
    let script = times
        .iter()
        .map(|&ms| Step::StateAt(Duration::from_millis(ms)))
        .collect();
    let (robot, _handle) = scripted(script);

    let mut periods = Vec::new();
    robot
        .control_torques(|_, period| {
            periods.push(period);
            Ok(if periods.len() == 4 {
                Flow::Finished(Torques::zero())
            } else {
                Flow::Continue(Torques::zero())
            })
        })
        .unwrap();

    assert_eq!(
        periods,
        vec![
            PERIOD,
            Duration::from_millis(1),
            Duration::from_millis(2),
            Duration::from_millis(1),
        ]
    );
    assert!(periods.iter().all(|p| *p > Duration::ZERO));
}

#[test]
fn test_stalled_robot_clock_is_fatal() {
    let script = vec![
        Step::StateAt(Duration::from_millis(5)),
        Step::StateAt(Duration::from_millis(6)),
        Step::StateAt(Duration::from_millis(6)),
    ];
    let (robot, handle) = scripted(script);

    let err = robot
        .control_torques(|_, _| Ok(Flow::Continue(Torques::zero())))
        .unwrap_err();
    assert!(matches!(
        err,
        RobotError::Communication(DriverError::NonMonotonicTime { .. })
    ));
    assert_eq!(handle.sent_count(), 2);
}

// ==================== 会话独占 ====================

#[test]
fn test_concurrent_session_rejected_immediately() {
    let (robot, _handle) = loopback();
    let reading = AtomicBool::new(false);
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            robot
                .read(|_| {
                    reading.store(true, Ordering::SeqCst);
                    !done.load(Ordering::SeqCst)
                })
                .unwrap();
        });

        while !reading.load(Ordering::SeqCst) {
            thread::yield_now();
        }

        let start = Instant::now();
        let result = robot.control_torques(finish_after(1, Torques::zero()));
        let elapsed = start.elapsed();
        let busy_once = robot.read_once();
        let busy_command = robot.set_joint_impedance([100.0; 7]);
        done.store(true, Ordering::SeqCst);

        assert!(matches!(result, Err(RobotError::SessionBusy)));
        assert!(matches!(busy_once, Err(RobotError::SessionBusy)));
        assert!(matches!(busy_command, Err(RobotError::SessionBusy)));
        assert!(elapsed < Duration::from_millis(100), "took {:?}", elapsed);
    });

    assert_eq!(robot.metrics().sessions_rejected, 3);
    assert_released(&robot);
}

#[test]
fn test_exactly_one_concurrent_start_succeeds() {
    const THREADS: usize = 8;
    let (robot, _handle) = loopback();
    let barrier = Barrier::new(THREADS);
    let active = AtomicUsize::new(0);
    let max_active = AtomicUsize::new(0);
    let succeeded = AtomicUsize::new(0);
    let busy = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                let deadline = Instant::now() + Duration::from_secs(5);
                let mut first = true;
                // 持有会话直到其它线程全部尝试过
                let result = robot.read(|_| {
                    if first {
                        first = false;
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_active.fetch_max(now, Ordering::SeqCst);
                    }
                    let keep = busy.load(Ordering::SeqCst) < THREADS - 1
                        && Instant::now() < deadline;
                    if !keep {
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                    keep
                });
                match result {
                    Ok(()) => succeeded.fetch_add(1, Ordering::SeqCst),
                    Err(RobotError::SessionBusy) => busy.fetch_add(1, Ordering::SeqCst),
                    Err(e) => panic!("unexpected error: {}", e),
                };
            });
        }
    });

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
    assert_eq!(succeeded.load(Ordering::SeqCst), 1);
    assert_eq!(busy.load(Ordering::SeqCst), THREADS - 1);
    assert_released(&robot);
}

#[test]
fn test_latest_state_readable_during_session() {
    let (robot, _handle) = loopback();
    let robot = Arc::new(robot);
    let observer = robot.observer();

    let mut seen = Vec::new();
    robot
        .control_torques(|state, _| {
            seen.push(observer.message_id() == Some(state.message_id));
            Ok(if seen.len() == 10 {
                Flow::Finished(Torques::zero())
            } else {
                Flow::Continue(Torques::zero())
            })
        })
        .unwrap();
    assert!(seen.iter().all(|&ok| ok));
}
