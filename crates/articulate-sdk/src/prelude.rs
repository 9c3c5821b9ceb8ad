//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use articulate_sdk::prelude::*;
//! ```

// 设备边界
pub use articulate_hal::{PwmBus, ServoChannel, ServoDevice, ServoTrim, StepDirection, StepperMotor, share};

// 部件与序列
pub use articulate_parts::{
    ActionSequence, ActionSpeed, Actuator, LinearMovement, OpenCloseMovement, Rotator, RotationMovement,
    RotatorStepper, ServoLinearActuator, ServoRotator, ServoSwitch, Shared, shared, stop_check,
};

// 执行器
pub use articulate_executor::{
    EventBus, ExecutorConfig, ExecutorHooks, ExecutorState, SequenceCompleted, SequenceExecutor, SequenceOutcome,
    StateBoard,
};

// 错误类型
pub use articulate_executor::ExecutorError;
pub use articulate_hal::HalError;
pub use articulate_parts::PartsError;
