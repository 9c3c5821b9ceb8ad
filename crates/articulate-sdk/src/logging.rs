//! 日志初始化
//!
//! 过滤规则取自 `RUST_LOG`，未设置时使用默认级别。重复调用是安全的，
//! 只有第一次会安装订阅器。

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` 未设置时的默认过滤规则
pub const DEFAULT_FILTER: &str = "info";

/// 安装 fmt 订阅器，返回本次是否安装成功
pub fn init_logging() -> bool {
    init_logging_with(DEFAULT_FILTER)
}

/// 同 [`init_logging`]，`RUST_LOG` 未设置时使用 `fallback`
pub fn init_logging_with(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let installed = tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok();
    if installed {
        tracing::debug!("Logging initialized");
    }
    installed
}
