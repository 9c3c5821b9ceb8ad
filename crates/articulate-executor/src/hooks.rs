//! 执行器钩子
//!
//! 应用层通过 [`ExecutorHooks`] 接入执行生命周期：点亮指示灯、向 UI 推送
//! 当前位置、全局关机时阻止后续 Action 等。
//!
//! # 调用线程
//!
//! - `pre_execution`: 在提交方线程上同步调用（序列被接受之后、交给执行线程之前）
//! - 其余回调: 在执行线程上调用
//!
//! 执行线程上的回调 panic 会被捕获并记录，不会杀死执行线程。

use crate::state::SequenceOutcome;
use articulate_parts::ActionSequence;
use std::sync::Arc;

/// 执行生命周期回调
pub trait ExecutorHooks: Send + Sync {
    /// 序列被接受后、开始执行前
    fn pre_execution(&self, sequence: &ActionSequence) {
        let _ = sequence;
    }

    /// 序列结束后（完成、取消、故障都会调用）
    fn post_execution(&self, sequence: &ActionSequence, outcome: &SequenceOutcome) {
        let _ = (sequence, outcome);
    }

    /// 每个 Action 完成后以及序列结束时，发布当前可观测状态
    fn update_current_state(&self) {}

    /// 启动下一个 Action 之前检查；返回 false 时跳过剩余 Action
    fn can_run(&self) -> bool {
        true
    }
}

/// 空钩子
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ExecutorHooks for NoopHooks {}

/// 钩子管理器
///
/// 按注册顺序调用多个钩子；`can_run` 需要所有钩子都同意。
#[derive(Default, Clone)]
pub struct HookManager {
    hooks: Vec<Arc<dyn ExecutorHooks>>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, hook: Arc<dyn ExecutorHooks>) {
        self.hooks.push(hook);
    }

    pub fn with(mut self, hook: Arc<dyn ExecutorHooks>) -> Self {
        self.add(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl ExecutorHooks for HookManager {
    fn pre_execution(&self, sequence: &ActionSequence) {
        for hook in &self.hooks {
            hook.pre_execution(sequence);
        }
    }

    fn post_execution(&self, sequence: &ActionSequence, outcome: &SequenceOutcome) {
        for hook in &self.hooks {
            hook.post_execution(sequence, outcome);
        }
    }

    fn update_current_state(&self) {
        for hook in &self.hooks {
            hook.update_current_state();
        }
    }

    fn can_run(&self) -> bool {
        self.hooks.iter().all(|hook| hook.can_run())
    }
}
