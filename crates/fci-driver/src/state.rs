//! 最新状态缓存
//!
//! 控制线程每收到一个状态就写入 [`ArcSwapOption`]，
//! 其他线程通过 [`StateObserver`] 无锁读取，无需获取会话锁。

use arc_swap::ArcSwapOption;
use fci_protocol::{ReportedControllerMode, RobotMode, RobotState};
use std::sync::Arc;

/// 最新状态的只读观察者（可克隆、可跨线程）
#[derive(Clone, Default)]
pub struct StateObserver {
    latest: Arc<ArcSwapOption<RobotState>>,
}

impl StateObserver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, state: &RobotState) {
        self.latest.store(Some(Arc::new(state.clone())));
    }

    /// 最近一次收到的状态（尚未收到时为 `None`）
    pub fn latest(&self) -> Option<Arc<RobotState>> {
        self.latest.load_full()
    }

    pub fn message_id(&self) -> Option<u64> {
        self.latest.load_full().map(|state| state.message_id)
    }

    pub fn controller_mode(&self) -> Option<ReportedControllerMode> {
        self.latest.load_full().map(|state| state.controller_mode)
    }

    pub fn robot_mode(&self) -> Option<RobotMode> {
        self.latest.load_full().map(|state| state.robot_mode)
    }
}

impl std::fmt::Debug for StateObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateObserver")
            .field("message_id", &self.message_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_observer() {
        let observer = StateObserver::new();
        assert!(observer.latest().is_none());
        assert_eq!(observer.message_id(), None);
    }

    #[test]
    fn test_publish_visible_to_clones() {
        let observer = StateObserver::new();
        let reader = observer.clone();

        let state = RobotState {
            message_id: 17,
            controller_mode: ReportedControllerMode::CartesianImpedance,
            ..Default::default()
        };
        observer.publish(&state);

        assert_eq!(reader.message_id(), Some(17));
        assert_eq!(
            reader.controller_mode(),
            Some(ReportedControllerMode::CartesianImpedance)
        );
        assert_eq!(reader.latest().unwrap().message_id, 17);
    }

    #[test]
    fn test_concurrent_readers() {
        let observer = StateObserver::new();
        std::thread::scope(|s| {
            let reader = observer.clone();
            s.spawn(move || {
                for _ in 0..1000 {
                    if let Some(id) = reader.message_id() {
                        assert!(id <= 100);
                    }
                }
            });
            for id in 1..=100 {
                observer.publish(&RobotState {
                    message_id: id,
                    ..Default::default()
                });
            }
        });
        assert_eq!(observer.message_id(), Some(100));
    }
}
