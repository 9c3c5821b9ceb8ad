//! Articulate SDK - 舵机 / 步进电机动作编排
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **HAL 层** (`hal`): 设备驱动边界（舵机、步进电机、PWM 总线）
//! - **部件层** (`parts`): 运动、执行器运动学、Action 与序列 DSL
//! - **执行层** (`executor`): 单序列执行器、钩子、完成事件
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use articulate_sdk::prelude::*;
//!
//! articulate_sdk::init_logging();
//!
//! let waist = shared(ServoRotator::new(servo, 0.0..=180.0, 0.0..=180.0)?.with_delta(1.0)?);
//! let home = ActionSequence::builder("Home")
//!     .action(|a| {
//!         a.rotate(&waist, 90.0).speed(ActionSpeed::Slow);
//!     })
//!     .build()?;
//!
//! let executor = SequenceExecutor::new("arm")?;
//! executor.submit(home)?;
//! ```

pub use articulate_executor as executor;
pub use articulate_hal as hal;
pub use articulate_parts as parts;

pub mod logging;
pub mod prelude;

pub use logging::{init_logging, init_logging_with};

// 常用类型
pub use articulate_executor::{
    ExecutorBuilder, ExecutorConfig, ExecutorError, ExecutorHooks, ExecutorRequest, ExecutorState,
    SequenceCompleted, SequenceExecutor, SequenceOutcome,
};
pub use articulate_hal::HalError;
pub use articulate_parts::{ActionSequence, ActionSpeed, PartsError};
