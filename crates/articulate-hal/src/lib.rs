//! # Articulate HAL
//!
//! 设备驱动边界层：执行器只通过这里的 Trait 访问硬件。
//!
//! - [`ServoDevice`]: "设置角度 / 读取当前角度" 原语（PWM 舵机）
//! - [`StepperMotor`]: 单步脉冲原语（步进电机）
//! - [`PwmBus`]: 多通道 PWM 控制器（一个总线上挂多个舵机）
//!
//! 所有调用都假定为同步且有界耗时，传输方式（PWM、GPIO、I2C）不在此层约定。
//!
//! 硬件句柄在进程启动时构造一次，通过 [`SharedBus`]（引用计数 + 锁）
//! 分发给各个通道，不使用全局可变静态量。

use std::sync::Arc;
use thiserror::Error;

pub mod servo;
pub mod stepper;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use servo::{ServoChannel, ServoTrim};
pub use stepper::StepDirection;

/// 共享的硬件总线句柄
///
/// 同一个 PWM 控制器上的多个舵机通道共享一个总线实例。
pub type SharedBus<B> = Arc<parking_lot::Mutex<B>>;

/// 将总线包装为共享句柄
pub fn share<B>(bus: B) -> SharedBus<B> {
    Arc::new(parking_lot::Mutex::new(bus))
}

/// HAL 层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Invalid channel {channel} (bus has {available} channels)")]
    InvalidChannel { channel: u8, available: u8 },
    #[error("Angle {angle:.2} outside servo range 0..={range:.2}")]
    AngleOutOfRange { angle: f32, range: f32 },
    #[error("Device released")]
    Released,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NoDevice,
    Busy,
    BusFault,
    InvalidResponse,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, DeviceErrorKind::NoDevice | DeviceErrorKind::BusFault)
    }
}

impl From<&str> for DeviceError {
    fn from(message: &str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// 舵机设备
///
/// PWM 舵机通常无法回读实际位置，`angle()` 返回最近一次下发的角度。
pub trait ServoDevice: Send {
    /// 当前角度（舵机自身的指令角度，单位：度）
    fn angle(&self) -> f32;

    /// 下发新的角度
    fn set_angle(&mut self, angle: f32) -> Result<(), HalError>;
}

impl<S: ServoDevice + ?Sized> ServoDevice for Box<S> {
    fn angle(&self) -> f32 {
        (**self).angle()
    }

    fn set_angle(&mut self, angle: f32) -> Result<(), HalError> {
        (**self).set_angle(angle)
    }
}

/// 步进电机
pub trait StepperMotor: Send {
    /// 电机每转步数（不含外部减速比）
    fn steps_per_rotation(&self) -> u32;

    /// 向指定方向走一步
    fn step(&mut self, direction: StepDirection) -> Result<(), HalError>;

    /// 释放线圈（断电保持）
    fn release(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

impl<M: StepperMotor + ?Sized> StepperMotor for Box<M> {
    fn steps_per_rotation(&self) -> u32 {
        (**self).steps_per_rotation()
    }

    fn step(&mut self, direction: StepDirection) -> Result<(), HalError> {
        (**self).step(direction)
    }

    fn release(&mut self) -> Result<(), HalError> {
        (**self).release()
    }
}

/// 多通道 PWM 控制器
pub trait PwmBus: Send {
    /// 通道数量
    fn channels(&self) -> u8;

    /// 设置指定通道的脉宽（微秒）
    fn set_pulse_us(&mut self, channel: u8, pulse_us: f32) -> Result<(), HalError>;
}
