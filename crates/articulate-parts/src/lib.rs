//! # Articulate Parts
//!
//! 运动描述、执行器运动学与动作序列。
//!
//! ## 分层
//!
//! - [`Movement`]: 单个执行器的目标状态（角度 / 百分比 / 开合），可带终止谓词
//! - [`Actuator`]: "朝目标迈出一步" 的能力；每次调用最多一次物理写入
//! - [`Action`]: 一组同步推进的 (执行器, 运动)，一次一个 tick
//! - [`ActionSequence`]: 有序、可重放的 Action 计划
//!
//! 执行（单序列互斥、节拍、取消）由 `articulate-executor` 负责。

pub mod action;
pub mod actuator;
pub mod error;
pub mod linear;
pub mod movement;
pub mod pacing;
pub mod rotator;
pub mod sequence;
pub mod switch;

#[cfg(test)]
mod test_support;

pub use action::Action;
pub use actuator::{Actuator, Shared, shared};
pub use error::{PartsError, Result};
pub use linear::ServoLinearActuator;
pub use movement::{LinearMovement, Movement, OpenCloseMovement, RotationMovement, StopCheck, stop_check};
pub use pacing::TickClock;
pub use rotator::{Rotator, RotatorStepper, ServoRotator};
pub use sequence::{ActionBuilder, ActionPlan, ActionSequence, ActionSpeed, SequenceBuilder};
pub use switch::ServoSwitch;
