//! 舵机通道
//!
//! 把"角度"翻译成 PWM 脉宽，并写到共享的 [`PwmBus`] 上。

use crate::{HalError, PwmBus, ServoDevice, SharedBus};
use tracing::trace;

/// 舵机校准参数（脉宽与角度行程）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoTrim {
    /// 0 度对应的脉宽（微秒）
    pub min_pulse_us: f32,
    /// 最大角度对应的脉宽（微秒）
    pub max_pulse_us: f32,
    /// 角度行程（度）
    pub range_degrees: f32,
}

impl ServoTrim {
    /// 标准舵机：1000-2000μs / 180°
    pub const DEFAULT: Self = Self {
        min_pulse_us: 1000.0,
        max_pulse_us: 2000.0,
        range_degrees: 180.0,
    };

    /// TowerPro SG90 微型舵机
    pub const TOWERPRO_SG90: Self = Self {
        min_pulse_us: 600.0,
        max_pulse_us: 2400.0,
        range_degrees: 180.0,
    };

    /// TowerPro MG996R
    pub const TOWERPRO_MG996R: Self = Self {
        min_pulse_us: 500.0,
        max_pulse_us: 2500.0,
        range_degrees: 180.0,
    };

    /// 计算指定角度的脉宽
    ///
    /// # 错误
    /// - `HalError::AngleOutOfRange`: 角度超出 `0..=range_degrees`
    pub fn pulse_for(&self, angle: f32) -> Result<f32, HalError> {
        if !(0.0..=self.range_degrees).contains(&angle) {
            return Err(HalError::AngleOutOfRange {
                angle,
                range: self.range_degrees,
            });
        }
        let span = self.max_pulse_us - self.min_pulse_us;
        Ok(self.min_pulse_us + span * angle / self.range_degrees)
    }
}

impl Default for ServoTrim {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// 挂在共享 PWM 总线上的单个舵机
///
/// PWM 无法回读，`angle()` 返回最近一次成功下发的角度。
pub struct ServoChannel<B: PwmBus> {
    bus: SharedBus<B>,
    channel: u8,
    trim: ServoTrim,
    angle: f32,
}

impl<B: PwmBus> ServoChannel<B> {
    /// 创建舵机通道并立即驱动到 `initial_angle`
    ///
    /// # 错误
    /// - `HalError::InvalidChannel`: 通道号超出总线通道数
    /// - `HalError::AngleOutOfRange`: 初始角度超出校准行程
    pub fn new(
        bus: SharedBus<B>,
        channel: u8,
        trim: ServoTrim,
        initial_angle: f32,
    ) -> Result<Self, HalError> {
        let available = bus.lock().channels();
        if channel >= available {
            return Err(HalError::InvalidChannel { channel, available });
        }

        let mut servo = Self {
            bus,
            channel,
            trim,
            angle: initial_angle,
        };
        servo.set_angle(initial_angle)?;
        Ok(servo)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn trim(&self) -> ServoTrim {
        self.trim
    }
}

impl<B: PwmBus> ServoDevice for ServoChannel<B> {
    fn angle(&self) -> f32 {
        self.angle
    }

    fn set_angle(&mut self, angle: f32) -> Result<(), HalError> {
        let pulse_us = self.trim.pulse_for(angle)?;
        self.bus.lock().set_pulse_us(self.channel, pulse_us)?;
        trace!(channel = self.channel, angle, pulse_us, "servo pulse written");
        self.angle = angle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPwmBus;
    use crate::share;
    use proptest::prelude::*;

    #[test]
    fn test_pulse_for_endpoints() {
        let trim = ServoTrim::TOWERPRO_SG90;
        assert_eq!(trim.pulse_for(0.0).unwrap(), 600.0);
        assert_eq!(trim.pulse_for(180.0).unwrap(), 2400.0);
        assert_eq!(trim.pulse_for(90.0).unwrap(), 1500.0);
    }

    #[test]
    fn test_pulse_for_out_of_range() {
        let trim = ServoTrim::DEFAULT;
        assert!(matches!(
            trim.pulse_for(-1.0),
            Err(HalError::AngleOutOfRange { .. })
        ));
        assert!(matches!(
            trim.pulse_for(180.5),
            Err(HalError::AngleOutOfRange { .. })
        ));
    }

    #[test]
    fn test_channel_writes_to_shared_bus() {
        let bus = share(MockPwmBus::new(4));
        let mut left = ServoChannel::new(bus.clone(), 0, ServoTrim::DEFAULT, 0.0).unwrap();
        let mut right = ServoChannel::new(bus.clone(), 3, ServoTrim::DEFAULT, 180.0).unwrap();

        left.set_angle(90.0).unwrap();
        right.set_angle(45.0).unwrap();

        let guard = bus.lock();
        assert_eq!(guard.pulse(0), Some(1500.0));
        assert_eq!(guard.pulse(3), Some(1250.0));
        // 两次初始化 + 两次设置
        assert_eq!(guard.writes(), 4);
        assert_eq!(left.angle(), 90.0);
        assert_eq!(right.angle(), 45.0);
    }

    #[test]
    fn test_channel_rejects_invalid_channel() {
        let bus = share(MockPwmBus::new(2));
        let result = ServoChannel::new(bus, 2, ServoTrim::DEFAULT, 0.0);
        assert!(matches!(
            result,
            Err(HalError::InvalidChannel {
                channel: 2,
                available: 2
            })
        ));
    }

    #[test]
    fn test_failed_write_keeps_previous_angle() {
        let bus = share(MockPwmBus::new(1));
        let mut servo = ServoChannel::new(bus, 0, ServoTrim::DEFAULT, 30.0).unwrap();
        assert!(servo.set_angle(270.0).is_err());
        assert_eq!(servo.angle(), 30.0);
    }

    proptest! {
        #[test]
        fn prop_pulse_within_trim(angle in 0.0f32..=180.0) {
            let trim = ServoTrim::TOWERPRO_MG996R;
            let pulse = trim.pulse_for(angle).unwrap();
            prop_assert!(pulse >= trim.min_pulse_us - 1e-3);
            prop_assert!(pulse <= trim.max_pulse_us + 1e-3);
        }

        #[test]
        fn prop_pulse_monotonic(a in 0.0f32..=180.0, b in 0.0f32..=180.0) {
            let trim = ServoTrim::DEFAULT;
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(trim.pulse_for(lo).unwrap() <= trim.pulse_for(hi).unwrap());
        }
    }
}
