//! 执行器错误类型

use std::time::Duration;
use thiserror::Error;

/// 执行器错误
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// 已有序列在运行，新请求被拒绝（非致命，调用方可重试）
    #[error("Executor '{executor}' is busy; sequence '{sequence}' rejected")]
    Rejected { executor: String, sequence: String },

    /// 执行线程已退出
    #[error("Executor worker channel closed")]
    ChannelClosed,

    /// 等待序列停止超时
    #[error("Sequence did not stop within {0:?}")]
    StopTimeout(Duration),

    /// 无法创建执行线程
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// 配置错误
    #[error("Invalid executor configuration: {0}")]
    Config(String),
}

/// 执行器 Result 别名
pub type Result<T> = std::result::Result<T, ExecutorError>;
