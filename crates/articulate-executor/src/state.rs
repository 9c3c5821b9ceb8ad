//! 执行器状态机
//!
//! `Idle` --submit--> `Running` --完成/取消/故障--> `Idle`
//!
//! 状态用原子量保存：提交方通过 CAS 抢占 `Running`，
//! 之后只有拿到这次运行代数的一方会把它写回 `Idle`。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 执行器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ExecutorState {
    /// 没有序列在运行
    #[default]
    Idle = 0,

    /// 一个序列占有全部执行器
    Running = 1,
}

impl ExecutorState {
    /// 从 u8 转换，无效值视为 Idle
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("IDLE"),
            Self::Running => f.write_str("RUNNING"),
        }
    }
}

/// 执行器状态（原子版本，用于线程间共享）
///
/// 状态和运行代数打包在同一个原子量里：最低位是状态，其余位是代数。
/// 每次成功进入 `Running` 代数加一，停止请求按代数定位到具体的一次运行。
#[derive(Debug, Default)]
pub struct AtomicExecutorState {
    inner: AtomicU64,
}

impl AtomicExecutorState {
    pub fn new(state: ExecutorState) -> Self {
        Self {
            inner: AtomicU64::new(u64::from(state.as_u8())),
        }
    }

    pub fn get(&self, ordering: Ordering) -> ExecutorState {
        self.load(ordering).0
    }

    /// 同时读取状态和代数
    pub fn load(&self, ordering: Ordering) -> (ExecutorState, u64) {
        unpack(self.inner.load(ordering))
    }

    /// 从 `Idle` 进入 `Running`，成功返回新的代数；已在运行则返回 `None`
    pub fn try_begin(&self) -> Option<u64> {
        let mut current = self.inner.load(Ordering::Acquire);
        loop {
            let (state, generation) = unpack(current);
            if state.is_running() {
                return None;
            }
            let next = generation.wrapping_add(1);
            match self.inner.compare_exchange_weak(
                current,
                pack(ExecutorState::Running, next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(next),
                Err(observed) => current = observed,
            }
        }
    }

    /// 第 `generation` 次运行结束，回到 `Idle`
    pub fn end(&self, generation: u64) {
        self.inner
            .store(pack(ExecutorState::Idle, generation), Ordering::Release);
    }
}

fn pack(state: ExecutorState, generation: u64) -> u64 {
    (generation << 1) | u64::from(state.as_u8())
}

fn unpack(word: u64) -> (ExecutorState, u64) {
    (ExecutorState::from_u8((word & 1) as u8), word >> 1)
}

/// 一次序列执行的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// 全部 Action 正常完成
    Completed,

    /// 停止请求或 `can_run` 为假，剩余 `skipped` 个 Action 未启动
    Cancelled { skipped: usize },

    /// 推进 Action 时出错或 panic（ExecutionFault）
    Faulted(String),
}

impl SequenceOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_state_conversion() {
        assert_eq!(ExecutorState::from_u8(0), ExecutorState::Idle);
        assert_eq!(ExecutorState::from_u8(1), ExecutorState::Running);
        assert_eq!(ExecutorState::from_u8(42), ExecutorState::Idle);
        assert_eq!(ExecutorState::Running.as_u8(), 1);
        assert_eq!(ExecutorState::default(), ExecutorState::Idle);
        assert_eq!(ExecutorState::Running.to_string(), "RUNNING");
    }

    #[test]
    fn test_begin_and_end() {
        let state = AtomicExecutorState::new(ExecutorState::Idle);
        assert_eq!(state.load(Ordering::Acquire), (ExecutorState::Idle, 0));

        let first = state.try_begin().unwrap();
        assert_eq!(first, 1);
        assert!(state.try_begin().is_none());
        assert_eq!(state.load(Ordering::Acquire), (ExecutorState::Running, 1));

        state.end(first);
        assert!(state.get(Ordering::Acquire).is_idle());
        assert_eq!(state.try_begin(), Some(2));
    }

    #[test]
    fn test_only_one_thread_wins() {
        let state = Arc::new(AtomicExecutorState::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || state.try_begin())
            })
            .collect();

        let winners: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(winners, vec![1]);
    }
}
