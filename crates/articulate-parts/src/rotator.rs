//! 旋转执行器
//!
//! - [`RotatorStepper`]: 步进电机 + 外部减速比，每次调用走一步
//! - [`ServoRotator`]: 舵机，物理角度区间映射到舵机指令区间（建模齿轮或反向安装）

use crate::actuator::Actuator;
use crate::error::{PartsError, Result, check_range};
use crate::movement::RotationMovement;
use articulate_hal::{ServoDevice, StepDirection, StepperMotor};
use std::ops::RangeInclusive;
use tracing::trace;

/// 会转的东西
///
/// 所有 `Rotator` 自动实现 [`Actuator`]（运动类型为 [`RotationMovement`]）。
pub trait Rotator: Send + 'static {
    /// 朝 `angle` 迈出一步，返回是否已到达
    fn rotate_to(&mut self, angle: f32) -> Result<bool>;

    /// 当前角度（物理坐标）
    fn current(&self) -> f32;

    /// 声明的物理范围，`None` 表示无界
    fn physical_range(&self) -> Option<(f32, f32)> {
        None
    }
}

impl<R: Rotator> Actuator for R {
    type Movement = RotationMovement;
    type Target = f32;

    fn validate(&self, movement: &RotationMovement) -> Result<()> {
        match self.physical_range() {
            Some((min, max)) if !movement.is_relative() => check_range(movement.angle(), min, max),
            _ => Ok(()),
        }
    }

    fn resolve(&self, movement: &RotationMovement) -> Result<f32> {
        let target = if movement.is_relative() {
            self.current() + movement.angle()
        } else {
            movement.angle()
        };
        if let Some((min, max)) = self.physical_range() {
            check_range(target, min, max)?;
        }
        Ok(target)
    }

    fn advance(&mut self, target: f32) -> Result<bool> {
        self.rotate_to(target)
    }
}

/// 步进电机旋转器
///
/// 目标步数 `steps = angle * steps_per_rotation / gear_ratio / 360`（四舍五入），
/// 每次调用只走一步。`reversed` 表示电机相对期望方向反向安装。
pub struct RotatorStepper<M: StepperMotor> {
    motor: M,
    gear_ratio: f64,
    steps_per_rotation: f64,
    forward: StepDirection,
    location: i64,
}

impl<M: StepperMotor> RotatorStepper<M> {
    /// 创建步进旋转器（初始位置视为 0 度）
    ///
    /// # 错误
    /// - `PartsError::Configuration`: 减速比非正/非有限，或电机每转步数为 0
    pub fn new(motor: M, gear_ratio: f32) -> Result<Self> {
        if !gear_ratio.is_finite() || gear_ratio <= 0.0 {
            return Err(PartsError::configuration(format!(
                "Invalid gear ratio: {} (must be > 0)",
                gear_ratio
            )));
        }
        let steps_per_rotation = motor.steps_per_rotation();
        if steps_per_rotation == 0 {
            return Err(PartsError::configuration(
                "Stepper reports 0 steps per rotation",
            ));
        }

        Ok(Self {
            motor,
            gear_ratio: f64::from(gear_ratio),
            steps_per_rotation: f64::from(steps_per_rotation),
            forward: StepDirection::Forward,
            location: 0,
        })
    }

    /// 电机反向安装
    pub fn reversed(mut self) -> Self {
        self.forward = StepDirection::Backward;
        self
    }

    /// 当前步数位置
    pub fn location(&self) -> i64 {
        self.location
    }

    /// 释放线圈
    pub fn release(&mut self) -> Result<()> {
        self.motor.release()?;
        Ok(())
    }

    fn destination(&self, angle: f32) -> i64 {
        // f64 -> i64 饱和转换，无界目标（f32::MAX）不会溢出
        (f64::from(angle) * self.steps_per_rotation / self.gear_ratio / 360.0).round() as i64
    }
}

impl<M: StepperMotor + 'static> Rotator for RotatorStepper<M> {
    fn rotate_to(&mut self, angle: f32) -> Result<bool> {
        let destination = self.destination(angle);
        if destination == self.location {
            return Ok(true);
        }

        if destination > self.location {
            self.motor.step(self.forward)?;
            self.location += 1;
        } else {
            self.motor.step(self.forward.reverse())?;
            self.location -= 1;
        }
        Ok(destination == self.location)
    }

    fn current(&self) -> f32 {
        (self.location as f64 * 360.0 * self.gear_ratio / self.steps_per_rotation) as f32
    }
}

/// 舵机旋转器
///
/// 物理区间 `physical` 线性映射到舵机区间 `servo`；舵机区间允许反向
/// （如 `180.0..=0.0`）。
///
/// - 未配置 delta：一次跳到目标
/// - 配置了 delta：每次最多移动 delta，最后一步补齐剩余量
///
/// 到达目标容差内，或到达任一端点，都视为完成。
pub struct ServoRotator<S: ServoDevice> {
    servo: S,
    physical_min: f32,
    physical_max: f32,
    servo_start: f32,
    servo_end: f32,
    delta: Option<f32>,
    precision: f32,
}

impl<S: ServoDevice> ServoRotator<S> {
    pub const DEFAULT_PRECISION: f32 = 0.1;

    /// 创建舵机旋转器
    ///
    /// # 错误
    /// - `PartsError::Configuration`: 物理区间为空或反向，舵机区间为空
    pub fn new(servo: S, physical: RangeInclusive<f32>, servo_range: RangeInclusive<f32>) -> Result<Self> {
        let (physical_min, physical_max) = physical.into_inner();
        let (servo_start, servo_end) = servo_range.into_inner();

        if !(physical_min < physical_max) {
            return Err(PartsError::configuration(format!(
                "Invalid physical range {}..={}",
                physical_min, physical_max
            )));
        }
        if !servo_start.is_finite() || !servo_end.is_finite() || servo_start == servo_end {
            return Err(PartsError::configuration(format!(
                "Invalid servo range {}..={}",
                servo_start, servo_end
            )));
        }

        Ok(Self {
            servo,
            physical_min,
            physical_max,
            servo_start,
            servo_end,
            delta: None,
            precision: Self::DEFAULT_PRECISION,
        })
    }

    /// 每次调用最多移动的舵机角度
    pub fn with_delta(mut self, delta: f32) -> Result<Self> {
        if !delta.is_finite() || delta <= 0.0 {
            return Err(PartsError::configuration(format!(
                "Invalid servo delta: {} (must be > 0)",
                delta
            )));
        }
        self.delta = Some(delta);
        Ok(self)
    }

    pub fn with_precision(mut self, precision: f32) -> Self {
        self.precision = precision.abs();
        self
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }

    /// 物理角度 -> 舵机角度
    pub fn servo_angle_for(&self, physical: f32) -> f32 {
        // 先乘后除，整数区间下结果是精确的
        self.servo_start
            + (physical - self.physical_min) * (self.servo_end - self.servo_start)
                / (self.physical_max - self.physical_min)
    }

    fn physical_angle_for(&self, servo: f32) -> f32 {
        self.physical_min
            + (servo - self.servo_start) * (self.physical_max - self.physical_min)
                / (self.servo_end - self.servo_start)
    }

    fn clamp_to_servo(&self, angle: f32) -> f32 {
        let (lo, hi) = if self.servo_start <= self.servo_end {
            (self.servo_start, self.servo_end)
        } else {
            (self.servo_end, self.servo_start)
        };
        angle.clamp(lo, hi)
    }

    fn at_endpoint(&self, angle: f32) -> bool {
        (angle - self.servo_start).abs() < self.precision || (angle - self.servo_end).abs() < self.precision
    }
}

impl<S: ServoDevice + 'static> Rotator for ServoRotator<S> {
    fn rotate_to(&mut self, angle: f32) -> Result<bool> {
        check_range(angle, self.physical_min, self.physical_max)?;

        let target = self.servo_angle_for(angle);
        let current = self.servo.angle();

        let Some(delta) = self.delta else {
            if (target - current).abs() >= self.precision {
                self.servo.set_angle(target)?;
                trace!(physical = angle, servo = target, "servo rotator jumped");
            }
            return Ok(true);
        };

        let remaining = target - current;
        if remaining.abs() < self.precision {
            return Ok(true);
        }

        let next = self.clamp_to_servo(current + remaining.clamp(-delta, delta));
        self.servo.set_angle(next)?;
        Ok((target - next).abs() < self.precision || self.at_endpoint(next))
    }

    fn current(&self) -> f32 {
        self.physical_angle_for(self.servo.angle())
    }

    fn physical_range(&self) -> Option<(f32, f32)> {
        Some((self.physical_min, self.physical_max))
    }
}
