//! # Articulate Executor
//!
//! 单线程序列执行器：
//! - 同一时刻最多运行一个 [`ActionSequence`](articulate_parts::ActionSequence)（CAS 互斥，忙时拒绝）
//! - 按 [`ActionSpeed`](articulate_parts::ActionSpeed) 节拍推进每个 Action
//! - 协作式取消（阻塞的 `stop()` / 非阻塞的 `emergency_stop()`）
//! - 钩子、完成事件、原子指标
//!
//! 快照板 [`StateBoard`] 供钩子向 UI / 遥测线程发布当前位置。

pub mod config;
mod error;
pub mod events;
mod executor;
pub mod hooks;
pub mod metrics;
pub mod snapshot;
pub mod state;

pub use config::{ExecutorConfig, SpeedTable};
pub use error::{ExecutorError, Result};
pub use events::{ChannelPublisher, EventBus, PublishError, RemotePublisher, SequenceCompleted};
pub use executor::{ExecutorBuilder, ExecutorRequest, SequenceExecutor};
pub use hooks::{ExecutorHooks, HookManager, NoopHooks};
pub use metrics::{ExecutorMetrics, MetricsSnapshot};
pub use snapshot::StateBoard;
pub use state::{AtomicExecutorState, ExecutorState, SequenceOutcome};
