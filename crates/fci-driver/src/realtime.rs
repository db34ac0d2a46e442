//! 实时线程设置
//!
//! 控制会话在调用线程上运行。会话开始前按 [`RealtimeConfig`] 提升该线程的调度优先级。

use crate::DriverError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 实时调度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeConfig {
    /// 无法获得实时优先级时拒绝开始会话
    #[default]
    Enforce,
    /// 尽力提升优先级，失败只记录警告
    Ignore,
}

/// 按策略提升当前线程优先级
pub fn apply_realtime(config: RealtimeConfig) -> Result<(), DriverError> {
    match (raise_current_thread_priority(), config) {
        (Ok(()), _) => {
            info!("Control thread priority set to MAX (realtime)");
            Ok(())
        },
        (Err(reason), RealtimeConfig::Enforce) => Err(DriverError::Realtime(reason)),
        (Err(reason), RealtimeConfig::Ignore) => {
            warn!("Running without real-time priority: {}", reason);
            Ok(())
        },
    }
}

#[cfg(feature = "realtime")]
fn raise_current_thread_priority() -> Result<(), String> {
    use thread_priority::*;

    set_current_thread_priority(ThreadPriority::Max).map_err(|e| {
        format!(
            "failed to set thread priority: {}. \
             On Linux, you may need to run with CAP_SYS_NICE or raise the rtprio limit",
            e
        )
    })
}

#[cfg(not(feature = "realtime"))]
fn raise_current_thread_priority() -> Result<(), String> {
    Err("built without the `realtime` feature".to_string())
}
