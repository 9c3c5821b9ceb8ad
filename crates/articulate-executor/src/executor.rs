//! 序列执行器
//!
//! 每个执行器拥有一个专用执行线程，同一时刻最多运行一个序列。
//!
//! # 协议
//!
//! - [`SequenceExecutor::submit`]: 非阻塞。CAS 抢占 `Running`，失败即拒绝
//! - [`SequenceExecutor::stop`]: 阻塞。置停止标志，等待执行线程回到 `Idle`
//! - [`SequenceExecutor::emergency_stop`]: 非阻塞。只置停止标志
//!
//! 取消是协作式的：停止标志在每个 tick 之后、每个 Action 开始之前检查，
//! 不会打断正在进行的设备写入。
//!
//! 每次被接受的运行都有一个代数。停止请求记录的是发出请求时正在运行的代数，
//! 迟到的请求对之后的运行不起作用，标志也不需要清除。
//!
//! # 线程模型
//!
//! 执行器只在执行线程上被驱动；`state` 与 `stop` 是唯一跨线程访问的状态。
//! 不同的执行器（例如机械臂和转台）各自拥有线程，但绝不能共享同一个执行器部件。

use crate::config::ExecutorConfig;
use crate::error::{ExecutorError, Result};
use crate::events::{EventBus, RemotePublisher, SequenceCompleted};
use crate::hooks::{ExecutorHooks, NoopHooks};
use crate::metrics::{ExecutorMetrics, MetricsSnapshot};
use crate::state::{AtomicExecutorState, ExecutorState, SequenceOutcome};
use articulate_parts::ActionSequence;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// 执行请求（统一入口）
#[derive(Debug)]
pub enum ExecutorRequest {
    /// 运行序列
    Run(ActionSequence),
    /// 紧急停止（非阻塞）
    EmergencyStop,
}

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        let (tx, rx) = bounded(1);

        // 看门狗线程负责 join，超时后它会继续等待，进程退出时由 OS 回收
        thread::spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result,
            Err(RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 执行线程与外部共享的状态
struct Inner {
    name: String,
    config: ExecutorConfig,
    state: AtomicExecutorState,
    // 被请求停止的最大代数
    stop: AtomicU64,
    hooks: Arc<dyn ExecutorHooks>,
    metrics: ExecutorMetrics,
    event_bus: Option<Arc<EventBus<SequenceCompleted>>>,
    remote: Option<Arc<dyn RemotePublisher>>,
}

impl Inner {
    /// 请求停止正在运行的那一代，返回其代数；空闲时返回 `None`
    fn request_stop(&self) -> Option<u64> {
        let (state, generation) = self.state.load(Ordering::Acquire);
        if !state.is_running() {
            return None;
        }
        self.stop.fetch_max(generation, Ordering::AcqRel);
        Some(generation)
    }

    fn stop_requested(&self, generation: u64) -> bool {
        self.stop.load(Ordering::Acquire) >= generation
    }
}

/// 交给执行线程的一次运行
struct Job {
    generation: u64,
    sequence: ActionSequence,
}

/// 执行器构建器
///
/// # Example
///
/// ```rust,ignore
/// let bus = Arc::new(EventBus::new());
/// let executor = ExecutorBuilder::new("arm")
///     .config(ExecutorConfig::from_toml_file("executor.toml")?)
///     .hooks(Arc::new(MyHooks::default()))
///     .event_bus(bus.clone())
///     .build()?;
/// ```
pub struct ExecutorBuilder {
    name: String,
    config: ExecutorConfig,
    hooks: Arc<dyn ExecutorHooks>,
    event_bus: Option<Arc<EventBus<SequenceCompleted>>>,
    remote: Option<Arc<dyn RemotePublisher>>,
}

impl ExecutorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ExecutorConfig::default(),
            hooks: Arc::new(NoopHooks),
            event_bus: None,
            remote: None,
        }
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ExecutorHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// 进程内完成事件总线（发布到 `internal_topic`）
    pub fn event_bus(mut self, bus: Arc<EventBus<SequenceCompleted>>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// 跨进程完成事件（JSON，发布到 `event_topic`）
    pub fn remote_publisher(mut self, publisher: Arc<dyn RemotePublisher>) -> Self {
        self.remote = Some(publisher);
        self
    }

    /// 校验配置并启动执行线程
    ///
    /// # 错误
    /// - `ExecutorError::Config`: 名称为空或配置非法
    /// - `ExecutorError::Spawn`: 无法创建线程
    pub fn build(self) -> Result<SequenceExecutor> {
        if self.name.is_empty() {
            return Err(ExecutorError::Config("executor name must not be empty".to_string()));
        }
        self.config.validate()?;

        let inner = Arc::new(Inner {
            name: self.name,
            config: self.config,
            state: AtomicExecutorState::new(ExecutorState::Idle),
            stop: AtomicU64::new(0),
            hooks: self.hooks,
            metrics: ExecutorMetrics::new(),
            event_bus: self.event_bus,
            remote: self.remote,
        });

        // 同一时刻最多只有一个待处理的序列
        let (jobs_tx, jobs_rx) = bounded(1);
        let worker_inner = inner.clone();
        let worker = thread::Builder::new()
            .name(format!("{}-{}", inner.config.worker_name, inner.name))
            .spawn(move || worker_loop(worker_inner, jobs_rx))
            .map_err(ExecutorError::Spawn)?;

        info!(executor = %inner.name, "Sequence executor started");
        Ok(SequenceExecutor {
            inner,
            jobs: Some(jobs_tx),
            worker: Some(worker),
        })
    }
}

/// 序列执行器
pub struct SequenceExecutor {
    inner: Arc<Inner>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl SequenceExecutor {
    /// 使用默认配置、无钩子创建执行器
    pub fn new(name: impl Into<String>) -> Result<Self> {
        ExecutorBuilder::new(name).build()
    }

    pub fn builder(name: impl Into<String>) -> ExecutorBuilder {
        ExecutorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ExecutorState {
        self.inner.state.get(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// 当前运行是否已被请求停止（空闲时为 false）
    pub fn is_stop_requested(&self) -> bool {
        let (state, generation) = self.inner.state.load(Ordering::Acquire);
        state.is_running() && self.inner.stop_requested(generation)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// 提交序列（非阻塞）
    ///
    /// 被接受后 `pre_execution` 钩子在当前线程上同步执行，然后交给执行线程。
    ///
    /// # 错误
    /// - `ExecutorError::Rejected`: 已有序列在运行
    /// - `ExecutorError::ChannelClosed`: 执行线程已退出
    pub fn submit(&self, sequence: ActionSequence) -> Result<()> {
        let inner = &self.inner;
        let Some(generation) = inner.state.try_begin() else {
            ExecutorMetrics::incr(&inner.metrics.rejected);
            warn!(
                executor = %inner.name,
                sequence = sequence.name(),
                "Sequence already running - rejected"
            );
            return Err(ExecutorError::Rejected {
                executor: inner.name.clone(),
                sequence: sequence.name().to_string(),
            });
        };

        let Some(jobs) = self.jobs.as_ref() else {
            inner.state.end(generation);
            return Err(ExecutorError::ChannelClosed);
        };

        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| inner.hooks.pre_execution(&sequence))) {
            inner.state.end(generation);
            resume_unwind(panic);
        }

        ExecutorMetrics::incr(&inner.metrics.accepted);
        info!(
            executor = %inner.name,
            sequence = sequence.name(),
            actions = sequence.len(),
            generation,
            "Sequence accepted"
        );

        if jobs.send(Job { generation, sequence }).is_err() {
            inner.state.end(generation);
            error!(executor = %inner.name, "Worker thread is gone; sequence dropped");
            return Err(ExecutorError::ChannelClosed);
        }
        Ok(())
    }

    /// 统一请求入口
    pub fn handle_request(&self, request: ExecutorRequest) -> Result<()> {
        match request {
            ExecutorRequest::Run(sequence) => self.submit(sequence),
            ExecutorRequest::EmergencyStop => {
                self.emergency_stop();
                Ok(())
            },
        }
    }

    /// 紧急停止：置停止标志后立即返回
    ///
    /// 没有序列在运行时什么也不做。
    pub fn emergency_stop(&self) {
        if let Some(generation) = self.inner.request_stop() {
            warn!(executor = %self.inner.name, generation, "Emergency stop requested");
        }
    }

    /// 停止当前序列，并阻塞直到执行器回到 `Idle`
    ///
    /// 不能在执行线程上（例如钩子里）调用，否则只能等到超时。
    ///
    /// # 错误
    /// - `ExecutorError::StopTimeout`: 超过 `stop_timeout_ms` 仍未停止
    pub fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        let Some(generation) = inner.request_stop() else {
            return Ok(());
        };
        debug!(executor = %inner.name, generation, "Stop requested, waiting for worker");

        let started = Instant::now();
        let timeout = inner.config.stop_timeout();
        let poll = inner.config.stop_poll();
        // 这一代结束即可返回，之后新提交的运行不在等待范围内
        while inner.state.load(Ordering::Acquire) == (ExecutorState::Running, generation) {
            if let Some(timeout) = timeout
                && started.elapsed() >= timeout
            {
                error!(
                    executor = %inner.name,
                    ?timeout,
                    "Sequence did not stop in time; actuators may still be moving"
                );
                return Err(ExecutorError::StopTimeout(timeout));
            }
            thread::sleep(poll);
        }
        Ok(())
    }

    /// 等待执行器回到 `Idle`，超时返回 false
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_running() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.inner.config.stop_poll());
        }
        true
    }
}

impl Drop for SequenceExecutor {
    fn drop(&mut self) {
        self.inner.request_stop();

        // 关闭请求通道，执行线程结束当前序列后退出
        drop(self.jobs.take());

        let join_timeout = self.inner.config.join_timeout();
        if let Some(handle) = self.worker.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                executor = %self.inner.name,
                "Worker thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

fn worker_loop(inner: Arc<Inner>, jobs: Receiver<Job>) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!(executor = %inner.name, "Worker thread priority set to MAX (realtime)"),
            Err(e) => warn!(
                executor = %inner.name,
                "Failed to set worker thread priority: {:?}. \
                 On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                e
            ),
        }
    }

    while let Ok(Job { generation, sequence }) = jobs.recv() {
        let run = || run_sequence(&inner, &sequence, generation);
        let outcome = match catch_unwind(AssertUnwindSafe(run)) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(
                    executor = %inner.name,
                    sequence = sequence.name(),
                    reason = %reason,
                    "Sequence panicked while stepping"
                );
                SequenceOutcome::Faulted(reason)
            },
        };
        finish(&inner, &sequence, generation, outcome);
    }

    debug!(executor = %inner.name, "Worker thread exiting");
}

fn run_sequence(inner: &Inner, sequence: &ActionSequence, generation: u64) -> SequenceOutcome {
    let plans = sequence.plans();

    for (index, plan) in plans.iter().enumerate() {
        if !inner.hooks.can_run() || inner.stop_requested(generation) {
            let skipped = plans.len() - index;
            info!(
                executor = %inner.name,
                sequence = sequence.name(),
                skipped,
                "Sequence cancelled"
            );
            return SequenceOutcome::Cancelled { skipped };
        }

        let tick = inner.config.tick_for(plan.speed());
        let mut action = plan.action();
        loop {
            let started = Instant::now();
            let running = match action.step(tick) {
                Ok(running) => running,
                Err(e) => {
                    error!(
                        executor = %inner.name,
                        sequence = sequence.name(),
                        action = index,
                        error = %e,
                        "Sequence faulted"
                    );
                    return SequenceOutcome::Faulted(e.to_string());
                },
            };

            let elapsed = started.elapsed();
            ExecutorMetrics::incr(&inner.metrics.ticks);
            if elapsed > tick * 2 {
                ExecutorMetrics::incr(&inner.metrics.overruns);
                warn!(
                    executor = %inner.name,
                    sequence = sequence.name(),
                    ?elapsed,
                    budget = ?tick,
                    "Action tick overrun"
                );
            } else if elapsed > tick + tick / 2 {
                trace!(executor = %inner.name, ?elapsed, budget = ?tick, "Action tick slow");
            }

            if !running {
                break;
            }

            // 停止请求在 tick 边界生效
            if inner.stop_requested(generation) {
                let skipped = plans.len() - index - 1;
                info!(
                    executor = %inner.name,
                    sequence = sequence.name(),
                    action = index,
                    skipped,
                    "Sequence cancelled mid-action"
                );
                return SequenceOutcome::Cancelled { skipped };
            }
        }

        inner.hooks.update_current_state();
    }

    SequenceOutcome::Completed
}

fn finish(inner: &Inner, sequence: &ActionSequence, generation: u64, outcome: SequenceOutcome) {
    match &outcome {
        SequenceOutcome::Completed => {
            ExecutorMetrics::incr(&inner.metrics.completed);
            info!(executor = %inner.name, sequence = sequence.name(), "Sequence completed");
        },
        SequenceOutcome::Cancelled { .. } => ExecutorMetrics::incr(&inner.metrics.cancelled),
        SequenceOutcome::Faulted(_) => ExecutorMetrics::incr(&inner.metrics.faulted),
    }

    guarded(inner, "post_execution", || inner.hooks.post_execution(sequence, &outcome));
    guarded(inner, "update_current_state", || inner.hooks.update_current_state());

    inner.state.end(generation);

    guarded(inner, "publish_completion", || publish_completion(inner, sequence));
}

fn publish_completion(inner: &Inner, sequence: &ActionSequence) {
    let event = SequenceCompleted::new(inner.name.as_str(), sequence.name());

    if let Some(bus) = &inner.event_bus {
        bus.publish(&inner.config.internal_topic, event.clone());
    }

    if let Some(remote) = &inner.remote {
        match event.to_json() {
            Ok(payload) => {
                if let Err(e) = remote.publish(&inner.config.event_topic, &payload) {
                    warn!(executor = %inner.name, error = %e, "Failed to publish completion event");
                }
            },
            Err(e) => error!(executor = %inner.name, error = %e, "Failed to encode completion event"),
        }
    }
}

/// 执行回调，捕获并记录 panic
fn guarded(inner: &Inner, what: &str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        error!(
            executor = %inner.name,
            hook = what,
            reason = %panic_message(panic.as_ref()),
            "Callback panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
