//! Mock 设备（用于测试和无硬件演示）
//!
//! 所有 Mock 都可以 `clone()`，克隆体共享同一份内部状态，
//! 这样测试可以把一个实例交给执行器，用另一个实例观察结果。

use crate::{DeviceError, DeviceErrorKind, HalError, PwmBus, ServoDevice, StepDirection, StepperMotor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Mock 舵机
#[derive(Clone)]
pub struct MockServo {
    angle: Arc<Mutex<f32>>,
    writes: Arc<AtomicU64>,
    fail_after: Arc<AtomicU64>,
}

impl MockServo {
    /// 创建位于 `angle` 的舵机
    pub fn new(angle: f32) -> Self {
        Self {
            angle: Arc::new(Mutex::new(angle)),
            writes: Arc::new(AtomicU64::new(0)),
            fail_after: Arc::new(AtomicU64::new(u64::MAX)),
        }
    }

    /// `set_angle` 调用次数
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// 第 `n` 次之后的写入全部失败
    pub fn fail_after(&self, n: u64) {
        self.fail_after.store(n, Ordering::Relaxed);
    }
}

impl ServoDevice for MockServo {
    fn angle(&self) -> f32 {
        *self.angle.lock()
    }

    fn set_angle(&mut self, angle: f32) -> Result<(), HalError> {
        let count = self.writes.fetch_add(1, Ordering::Relaxed);
        if count >= self.fail_after.load(Ordering::Relaxed) {
            return Err(DeviceError::new(DeviceErrorKind::BusFault, "mock servo fault").into());
        }
        *self.angle.lock() = angle;
        Ok(())
    }
}

/// Mock 步进电机
#[derive(Clone)]
pub struct MockStepper {
    steps_per_rotation: u32,
    position: Arc<AtomicI64>,
    forward: Arc<AtomicU64>,
    backward: Arc<AtomicU64>,
    released: Arc<AtomicBool>,
    fail_after: Arc<AtomicU64>,
}

impl MockStepper {
    pub fn new(steps_per_rotation: u32) -> Self {
        Self {
            steps_per_rotation,
            position: Arc::new(AtomicI64::new(0)),
            forward: Arc::new(AtomicU64::new(0)),
            backward: Arc::new(AtomicU64::new(0)),
            released: Arc::new(AtomicBool::new(false)),
            fail_after: Arc::new(AtomicU64::new(u64::MAX)),
        }
    }

    /// 净步数（Forward 为正）
    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Relaxed)
    }

    pub fn forward_steps(&self) -> u64 {
        self.forward.load(Ordering::Relaxed)
    }

    pub fn backward_steps(&self) -> u64 {
        self.backward.load(Ordering::Relaxed)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }

    /// 第 `n` 步之后的脉冲全部失败
    pub fn fail_after(&self, n: u64) {
        self.fail_after.store(n, Ordering::Relaxed);
    }
}

impl StepperMotor for MockStepper {
    fn steps_per_rotation(&self) -> u32 {
        self.steps_per_rotation
    }

    fn step(&mut self, direction: StepDirection) -> Result<(), HalError> {
        let total = self.forward_steps() + self.backward_steps();
        if total >= self.fail_after.load(Ordering::Relaxed) {
            return Err(DeviceError::new(DeviceErrorKind::BusFault, "mock stepper fault").into());
        }

        match direction {
            StepDirection::Forward => self.forward.fetch_add(1, Ordering::Relaxed),
            StepDirection::Backward => self.backward.fetch_add(1, Ordering::Relaxed),
        };
        self.position.fetch_add(direction.delta(), Ordering::Relaxed);
        self.released.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn release(&mut self) -> Result<(), HalError> {
        self.released.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Mock PWM 控制器
///
/// 记录每个通道最后一次写入的脉宽。
#[derive(Debug, Default)]
pub struct MockPwmBus {
    channels: u8,
    pulses: HashMap<u8, f32>,
    writes: u64,
}

impl MockPwmBus {
    pub fn new(channels: u8) -> Self {
        Self {
            channels,
            pulses: HashMap::new(),
            writes: 0,
        }
    }

    /// 指定通道最后一次写入的脉宽
    pub fn pulse(&self, channel: u8) -> Option<f32> {
        self.pulses.get(&channel).copied()
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl PwmBus for MockPwmBus {
    fn channels(&self) -> u8 {
        self.channels
    }

    fn set_pulse_us(&mut self, channel: u8, pulse_us: f32) -> Result<(), HalError> {
        if channel >= self.channels {
            return Err(HalError::InvalidChannel {
                channel,
                available: self.channels,
            });
        }
        self.pulses.insert(channel, pulse_us);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_servo_shares_state() {
        let servo = MockServo::new(10.0);
        let mut handle = servo.clone();
        handle.set_angle(42.0).unwrap();
        assert_eq!(servo.angle(), 42.0);
        assert_eq!(servo.writes(), 1);
    }

    #[test]
    fn test_mock_servo_failure_injection() {
        let mut servo = MockServo::new(0.0);
        servo.fail_after(2);
        assert!(servo.set_angle(1.0).is_ok());
        assert!(servo.set_angle(2.0).is_ok());
        assert!(servo.set_angle(3.0).is_err());
        assert_eq!(servo.angle(), 2.0);
    }

    #[test]
    fn test_mock_stepper_counts() {
        let stepper = MockStepper::new(200);
        let mut handle = stepper.clone();
        for _ in 0..5 {
            handle.step(StepDirection::Forward).unwrap();
        }
        handle.step(StepDirection::Backward).unwrap();
        handle.release().unwrap();

        assert_eq!(stepper.forward_steps(), 5);
        assert_eq!(stepper.backward_steps(), 1);
        assert_eq!(stepper.position(), 4);
        assert!(stepper.is_released());
    }

    #[test]
    fn test_mock_bus_rejects_unknown_channel() {
        let mut bus = MockPwmBus::new(2);
        assert!(bus.set_pulse_us(1, 1500.0).is_ok());
        assert!(bus.set_pulse_us(2, 1500.0).is_err());
        assert_eq!(bus.writes(), 1);
    }
}
