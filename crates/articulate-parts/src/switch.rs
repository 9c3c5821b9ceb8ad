//! 开合执行器（夹爪、闸门之类的"二值"机构）

use crate::actuator::Actuator;
use crate::error::{PartsError, Result};
use crate::movement::OpenCloseMovement;
use articulate_hal::ServoDevice;

/// 舵机开合执行器
///
/// 一次跳到开/合角度，舵机读数到达目标即完成。
pub struct ServoSwitch<S: ServoDevice> {
    servo: S,
    open_angle: f32,
    closed_angle: f32,
    precision: f32,
}

impl<S: ServoDevice> ServoSwitch<S> {
    /// # 错误
    /// - `PartsError::Configuration`: 开/合角度相同
    pub fn new(servo: S, open_angle: f32, closed_angle: f32) -> Result<Self> {
        if open_angle == closed_angle {
            return Err(PartsError::configuration(format!(
                "Open and closed angles are both {}",
                open_angle
            )));
        }
        Ok(Self {
            servo,
            open_angle,
            closed_angle,
            precision: 0.1,
        })
    }

    pub fn is_open(&self) -> bool {
        (self.servo.angle() - self.open_angle).abs() < self.precision
    }

    pub fn is_closed(&self) -> bool {
        (self.servo.angle() - self.closed_angle).abs() < self.precision
    }

    /// 开或合，返回是否已到位
    pub fn set_open(&mut self, open: bool) -> Result<bool> {
        let target = if open { self.open_angle } else { self.closed_angle };
        if (self.servo.angle() - target).abs() >= self.precision {
            self.servo.set_angle(target)?;
        }
        Ok((self.servo.angle() - target).abs() < self.precision)
    }
}

impl<S: ServoDevice + 'static> Actuator for ServoSwitch<S> {
    type Movement = OpenCloseMovement;
    type Target = bool;

    fn resolve(&self, movement: &OpenCloseMovement) -> Result<bool> {
        Ok(movement.is_open())
    }

    fn advance(&mut self, open: bool) -> Result<bool> {
        self.set_open(open)
    }
}
