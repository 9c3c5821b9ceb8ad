//! 运动描述（Movement）
//!
//! Movement 是对单个执行器"期望终态"的不可变描述，可以附带一个
//! 提前终止谓词（stop check）。谓词在每个 tick 的任何物理动作**之前**求值：
//! 谓词为真时，该 tick 不会产生任何硬件写入。

use crate::error::{PartsError, Result};
use std::fmt;
use std::sync::Arc;

/// 提前终止谓词
///
/// 在执行线程上调用，因此必须是 `Send + Sync`。
pub type StopCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// 将闭包包装为 [`StopCheck`]
pub fn stop_check<F>(check: F) -> StopCheck
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    Arc::new(check)
}

/// 运动描述的公共能力
pub trait Movement: Send + Sync + 'static {
    /// 附带的提前终止谓词
    fn stop_check(&self) -> Option<&StopCheck>;

    /// 是否应当停止（没有谓词时恒为 false）
    fn should_stop(&self) -> bool {
        self.stop_check().is_some_and(|check| check())
    }
}

/// 旋转运动（目标角度，单位：度）
#[derive(Clone)]
pub struct RotationMovement {
    angle: f32,
    relative: bool,
    stop_check: Option<StopCheck>,
}

impl RotationMovement {
    /// 旋转到绝对角度
    pub fn to(angle: f32) -> Self {
        Self {
            angle,
            relative: false,
            stop_check: None,
        }
    }

    /// 相对当前位置旋转 `delta` 度
    ///
    /// 相对目标在该运动第一次被执行时根据 `current()` 解析，之后固定不变。
    pub fn by(delta: f32) -> Self {
        Self {
            angle: delta,
            relative: true,
            stop_check: None,
        }
    }

    pub fn with_stop_check(mut self, check: StopCheck) -> Self {
        self.stop_check = Some(check);
        self
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }
}

impl Movement for RotationMovement {
    fn stop_check(&self) -> Option<&StopCheck> {
        self.stop_check.as_ref()
    }
}

impl fmt::Debug for RotationMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationMovement")
            .field("angle", &self.angle)
            .field("relative", &self.relative)
            .field("stop_check", &self.stop_check.is_some())
            .finish()
    }
}

/// 直线运动（0 = 完全收回，100 = 完全伸出）
#[derive(Clone)]
pub struct LinearMovement {
    percentage: i16,
    relative: bool,
    stop_check: Option<StopCheck>,
}

impl LinearMovement {
    /// 移动到绝对百分比
    ///
    /// # 错误
    /// - `PartsError::Range`: 百分比不在 `0..=100`
    pub fn to(percentage: i16) -> Result<Self> {
        if !(0..=100).contains(&percentage) {
            return Err(PartsError::Range {
                value: f32::from(percentage),
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self {
            percentage,
            relative: false,
            stop_check: None,
        })
    }

    /// 相对当前位置移动 `delta` 个百分点
    ///
    /// # 错误
    /// - `PartsError::Range`: `delta` 不在 `-100..=100`
    pub fn by(delta: i16) -> Result<Self> {
        if !(-100..=100).contains(&delta) {
            return Err(PartsError::Range {
                value: f32::from(delta),
                min: -100.0,
                max: 100.0,
            });
        }
        Ok(Self {
            percentage: delta,
            relative: true,
            stop_check: None,
        })
    }

    pub fn with_stop_check(mut self, check: StopCheck) -> Self {
        self.stop_check = Some(check);
        self
    }

    pub fn percentage(&self) -> i16 {
        self.percentage
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }
}

impl Movement for LinearMovement {
    fn stop_check(&self) -> Option<&StopCheck> {
        self.stop_check.as_ref()
    }
}

impl fmt::Debug for LinearMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearMovement")
            .field("percentage", &self.percentage)
            .field("relative", &self.relative)
            .field("stop_check", &self.stop_check.is_some())
            .finish()
    }
}

/// 开/合运动
#[derive(Clone)]
pub struct OpenCloseMovement {
    open: bool,
    stop_check: Option<StopCheck>,
}

impl OpenCloseMovement {
    pub fn new(open: bool) -> Self {
        Self {
            open,
            stop_check: None,
        }
    }

    pub fn open() -> Self {
        Self::new(true)
    }

    pub fn close() -> Self {
        Self::new(false)
    }

    pub fn with_stop_check(mut self, check: StopCheck) -> Self {
        self.stop_check = Some(check);
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Movement for OpenCloseMovement {
    fn stop_check(&self) -> Option<&StopCheck> {
        self.stop_check.as_ref()
    }
}

impl fmt::Debug for OpenCloseMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenCloseMovement")
            .field("open", &self.open)
            .field("stop_check", &self.stop_check.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_should_stop_without_check() {
        assert!(!RotationMovement::to(90.0).should_stop());
        assert!(!OpenCloseMovement::open().should_stop());
    }

    #[test]
    fn test_should_stop_follows_predicate() {
        let flag = Arc::new(AtomicBool::new(false));
        let observed = flag.clone();
        let movement =
            RotationMovement::by(15.0).with_stop_check(stop_check(move || observed.load(Ordering::SeqCst)));

        assert!(movement.is_relative());
        assert!(!movement.should_stop());
        flag.store(true, Ordering::SeqCst);
        assert!(movement.should_stop());
    }

    #[test]
    fn test_linear_percentage_bounds() {
        assert!(LinearMovement::to(0).is_ok());
        assert!(LinearMovement::to(100).is_ok());
        assert!(matches!(LinearMovement::to(101), Err(PartsError::Range { .. })));
        assert!(matches!(LinearMovement::to(-1), Err(PartsError::Range { .. })));
        assert!(LinearMovement::by(-100).is_ok());
        assert!(LinearMovement::by(150).is_err());
    }

    #[test]
    fn test_debug_hides_closure() {
        let movement = OpenCloseMovement::close().with_stop_check(stop_check(|| true));
        let text = format!("{:?}", movement);
        assert!(text.contains("open: false"));
        assert!(text.contains("stop_check: true"));
    }
}
