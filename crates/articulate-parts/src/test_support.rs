//! 单元测试共用的 Mock 旋转器

use crate::error::Result;
use crate::rotator::Rotator;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 每次调用移动 1 度的旋转器，统计被调用次数
pub(crate) struct MockRotator {
    angle: f32,
    calls: Arc<AtomicU64>,
}

impl MockRotator {
    pub(crate) fn new() -> Self {
        Self {
            angle: 0.0,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 调用计数器（可在执行器被锁住时从外部读取）
    pub(crate) fn calls(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }
}

impl Rotator for MockRotator {
    fn rotate_to(&mut self, angle: f32) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if (self.angle - angle).abs() < 1.0 {
            return Ok(true);
        }
        self.angle += if angle > self.angle { 1.0 } else { -1.0 };
        Ok((self.angle - angle).abs() < 1.0)
    }

    fn current(&self) -> f32 {
        self.angle
    }
}

/// 随机舵机角度（1..=180）
pub(crate) fn random_servo_angle() -> f32 {
    use rand::Rng;
    rand::thread_rng().gen_range(1..=180) as f32
}
