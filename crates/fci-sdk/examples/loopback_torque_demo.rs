//! 在模拟控制器上运行一个 2 秒的关节阻抗力矩控制
//!
//! ```bash
//! RUST_LOG=info cargo run -p fci-sdk --example loopback_torque_demo
//! ```

use fci_sdk::prelude::*;
use fci_sdk::transport::{LoopbackChannel, LoopbackConfig};
use std::time::Duration;

const STIFFNESS: [f64; 7] = [600.0, 600.0, 600.0, 600.0, 250.0, 150.0, 50.0];
const DAMPING: [f64; 7] = [50.0, 50.0, 50.0, 50.0, 30.0, 25.0, 15.0];

fn main() -> Result<(), RobotError> {
    fci_sdk::init_logging();

    let (channel, _handle) = LoopbackChannel::new(LoopbackConfig::default().with_pacing(true));
    let config = RobotConfig::default().with_realtime(RealtimeConfig::Ignore);
    let robot = Robot::connect(channel, config)?;

    robot.set_collision_behavior_uniform([20.0; 7], [40.0; 7], [10.0; 6], [20.0; 6])?;
    robot.set_joint_impedance([3000.0, 3000.0, 3000.0, 2500.0, 2500.0, 2000.0, 2000.0])?;

    let initial = robot.read_once()?;
    let mut time = Duration::ZERO;
    robot.control_torques(|state, period| {
        time += period;
        let torques = Torques::new(std::array::from_fn(|i| {
            -STIFFNESS[i] * (state.q[i] - initial.q[i]) - DAMPING[i] * state.dq[i]
        }));
        Ok(if time >= Duration::from_secs(2) {
            Flow::Finished(torques)
        } else {
            Flow::Continue(torques)
        })
    })?;

    let metrics = robot.metrics();
    println!(
        "states: {}, commands: {}, timeouts: {}",
        metrics.states_received, metrics.commands_sent, metrics.receive_timeouts
    );
    Ok(())
}
