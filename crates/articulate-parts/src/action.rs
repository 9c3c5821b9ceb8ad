//! Action：一组需要同步推进的 (执行器, 运动) 对
//!
//! Action 是一次性的：推进到完成后即丢弃，不可重置，也不是线程安全的。
//! 同一个计划每次执行都会派生出新的 Action 实例。

use crate::actuator::{Drive, MovementBinding};
use crate::error::Result;
use crate::pacing::TickClock;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;

/// 单次运行的 Action
pub struct Action {
    drives: SmallVec<[Box<dyn Drive>; 4]>,
    // 已完成的执行器不再被驱动
    done: SmallVec<[bool; 4]>,
}

impl Action {
    pub(crate) fn from_bindings(bindings: &[Arc<dyn MovementBinding>]) -> Self {
        let drives: SmallVec<[Box<dyn Drive>; 4]> =
            bindings.iter().map(|binding| Arc::clone(binding).start()).collect();
        let done = SmallVec::from_elem(false, drives.len());
        Self { drives, done }
    }

    /// 槽位数量
    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    /// 是否所有槽位都已完成
    pub fn is_complete(&self) -> bool {
        self.done.iter().all(|done| *done)
    }

    /// 推进一个 tick
    ///
    /// `max_tick` 平均分给每个槽位；每个槽位（包括已完成的）都要等到自己的
    /// 截止时刻，最后一个截止时刻就是 `max_tick`，因此整个 tick 至少耗时 `max_tick`。
    ///
    /// 返回 `true` 表示仍有槽位未完成（需要继续调用）。
    ///
    /// # 错误
    /// 任一执行器出错立即返回，本 tick 余下的槽位不再推进。
    pub fn step(&mut self, max_tick: Duration) -> Result<bool> {
        if self.drives.is_empty() {
            return Ok(false);
        }

        let clock = TickClock::start(max_tick, self.drives.len());
        for (index, (drive, done)) in self.drives.iter_mut().zip(self.done.iter_mut()).enumerate() {
            if !*done {
                *done = drive.tick()?;
            }
            clock.finish_slot(index);
        }

        Ok(!self.is_complete())
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("slots", &self.drives.len())
            .field("done", &self.done)
            .finish()
    }
}
