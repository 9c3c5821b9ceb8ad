//! 当前状态快照板
//!
//! 执行线程在 `update_current_state` 中写入最新快照，UI / 遥测线程随时无锁读取，
//! 观察者永远不直接访问执行器内部字段。

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 最新快照（单写多读）
pub struct StateBoard<T> {
    current: ArcSwap<T>,
    version: AtomicU64,
}

impl<T> StateBoard<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            version: AtomicU64::new(0),
        }
    }

    /// 发布新快照
    pub fn publish(&self, snapshot: T) {
        self.current.store(Arc::new(snapshot));
        self.version.fetch_add(1, Ordering::Release);
    }

    /// 读取最新快照
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// 已发布的次数
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl<T: Default> Default for StateBoard<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
