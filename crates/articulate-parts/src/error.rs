//! 执行器部件层错误类型

use articulate_hal::HalError;
use thiserror::Error;

/// 部件层错误
#[derive(Error, Debug)]
pub enum PartsError {
    /// 标定参数非法（减速比 <= 0、空区间等），构造时立即失败
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 目标超出声明的物理范围
    #[error("Target {value:.2} outside range {min:.2}..={max:.2}")]
    Range { value: f32, min: f32, max: f32 },

    /// 底层设备错误
    #[error("Device error: {0}")]
    Device(#[from] HalError),
}

impl PartsError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// 部件层 Result 别名
pub type Result<T> = std::result::Result<T, PartsError>;

/// 检查 `value` 是否位于 `[min, max]` 内
pub(crate) fn check_range(value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(PartsError::Range { value, min, max });
    }
    Ok(())
}
