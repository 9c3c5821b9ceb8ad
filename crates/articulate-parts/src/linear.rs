//! 直线执行器
//!
//! 用舵机驱动的伸缩机构：0% 对应 `home` 角度，100% 对应 `maximum` 角度，
//! `maximum` 可以小于 `home`（反向安装）。

use crate::actuator::Actuator;
use crate::error::{PartsError, Result};
use crate::movement::LinearMovement;
use articulate_hal::ServoDevice;

/// 舵机直线执行器
///
/// 每次调用舵机移动 1 度。到达容差为 1% 与半度对应百分比中的较大者，
/// 行程很短时 1 度就超过 1%，容差随之放宽。
pub struct ServoLinearActuator<S: ServoDevice> {
    servo: S,
    home: f32,
    maximum: f32,
    swing: f32,
    direction: f32,
}

impl<S: ServoDevice> ServoLinearActuator<S> {
    /// # 错误
    /// - `PartsError::Configuration`: `home` 与 `maximum` 相同或非有限
    pub fn new(servo: S, home: f32, maximum: f32) -> Result<Self> {
        let swing = (maximum - home).abs();
        if !swing.is_finite() || swing == 0.0 {
            return Err(PartsError::configuration(format!(
                "Invalid linear swing {}..{}",
                home, maximum
            )));
        }

        Ok(Self {
            servo,
            home,
            maximum,
            swing,
            direction: if maximum > home { 1.0 } else { -1.0 },
        })
    }

    /// 当前伸出百分比
    pub fn current(&self) -> i16 {
        self.position().round() as i16
    }

    /// 未取整的伸出百分比
    fn position(&self) -> f32 {
        (self.servo.angle() - self.home).abs() * 100.0 / self.swing
    }

    /// 到达容差（百分比）
    fn tolerance(&self) -> f32 {
        (50.0 / self.swing).max(1.0)
    }

    /// 朝 `percentage` 移动一步，返回是否已到达
    pub fn extend_to(&mut self, percentage: i16) -> Result<bool> {
        if !(0..=100).contains(&percentage) {
            return Err(PartsError::Range {
                value: f32::from(percentage),
                min: 0.0,
                max: 100.0,
            });
        }

        let target = f32::from(percentage);
        let tolerance = self.tolerance();
        let remaining = target - self.position();
        if remaining.abs() <= tolerance {
            return Ok(true);
        }

        // 超过半度才移动，走 1 度后剩余量严格减小
        let step = if remaining > 0.0 {
            self.direction
        } else {
            -self.direction
        };
        let next = self.clamp(self.servo.angle() + step);
        self.servo.set_angle(next)?;
        Ok((target - self.position()).abs() <= tolerance)
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }

    fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.home.min(self.maximum), self.home.max(self.maximum))
    }
}

impl<S: ServoDevice + 'static> Actuator for ServoLinearActuator<S> {
    type Movement = LinearMovement;
    type Target = i16;

    fn resolve(&self, movement: &LinearMovement) -> Result<i16> {
        let target = if movement.is_relative() {
            self.current() + movement.percentage()
        } else {
            movement.percentage()
        };
        if !(0..=100).contains(&target) {
            return Err(PartsError::Range {
                value: f32::from(target),
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(target)
    }

    fn advance(&mut self, target: i16) -> Result<bool> {
        self.extend_to(target)
    }
}
