//! 执行器指标
//!
//! 原子计数器，任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 执行器实时指标
#[derive(Debug, Default)]
pub struct ExecutorMetrics {
    /// 被接受的序列数
    pub accepted: AtomicU64,

    /// 因忙被拒绝的序列数
    pub rejected: AtomicU64,

    /// 正常完成的序列数
    pub completed: AtomicU64,

    /// 被取消的序列数
    pub cancelled: AtomicU64,

    /// 执行故障的序列数
    pub faulted: AtomicU64,

    /// Action tick 总数
    pub ticks: AtomicU64,

    /// tick 耗时超过两倍预算的次数
    ///
    /// 持续增长说明设备响应太慢，请求的速度无法达到。
    pub overruns: AtomicU64,
}

impl ExecutorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            faulted: self.faulted.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.accepted.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.cancelled.store(0, Ordering::Relaxed);
        self.faulted.store(0, Ordering::Relaxed);
        self.ticks.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub faulted: u64,
    pub ticks: u64,
    pub overruns: u64,
}

impl MetricsSnapshot {
    /// 已结束的序列数
    pub fn finished(&self) -> u64 {
        self.completed + self.cancelled + self.faulted
    }

    /// tick 超时率（百分比），没有 tick 时为 0
    pub fn overrun_rate(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        (self.overruns as f64 / self.ticks as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = ExecutorMetrics::new();
        ExecutorMetrics::incr(&metrics.accepted);
        ExecutorMetrics::incr(&metrics.completed);
        metrics.ticks.fetch_add(40, Ordering::Relaxed);
        metrics.overruns.fetch_add(2, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.finished(), 1);
        assert_eq!(snapshot.overrun_rate(), 5.0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(ExecutorMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        ExecutorMetrics::incr(&metrics.ticks);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().ticks, 4000);
        assert_eq!(MetricsSnapshot::default().overrun_rate(), 0.0);
    }
}
