//! Tick 节拍控制
//!
//! 执行器用"最短耗时"来限制物理设备的驱动速度：调用本身返回得再快，
//! 也要补足到给定时长。一个 tick 的预算按槽位切分，每个槽位等到自己的
//! 截止时刻；截止时刻从 tick 起点累计，最后一个槽位恰好落在整个预算上，
//! 整除余下的纳秒不会丢失。

use std::time::{Duration, Instant};

/// 单个 tick 的节拍时钟
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    start: Instant,
    budget: Duration,
    slots: u32,
}

impl TickClock {
    /// 从现在开始计时，`budget` 分给 `slots` 个槽位
    pub fn start(budget: Duration, slots: usize) -> Self {
        Self {
            start: Instant::now(),
            budget,
            slots: u32::try_from(slots).unwrap_or(u32::MAX).max(1),
        }
    }

    /// 第 `index` 个槽位（从 0 开始）结束时相对起点的偏移
    pub fn slot_offset(&self, index: usize) -> Duration {
        let ordinal = u32::try_from(index + 1).unwrap_or(u32::MAX).min(self.slots);
        if ordinal == self.slots {
            return self.budget;
        }
        self.budget
            .checked_mul(ordinal)
            .map_or(self.budget, |total| total / self.slots)
    }

    /// 用 `spin_sleep` 等到第 `index` 个槽位的截止时刻（微秒级精度），已超时则立即返回
    pub fn finish_slot(&self, index: usize) {
        let deadline = self.start + self.slot_offset(index);
        let now = Instant::now();
        if now < deadline {
            spin_sleep::sleep(deadline - now);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
