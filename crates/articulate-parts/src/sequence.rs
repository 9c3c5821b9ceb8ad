//! 动作序列与构建 DSL
//!
//! [`ActionSequence`] 是一份被动的执行计划：有序的 [`ActionPlan`] 列表加一个名字。
//! 计划本身不可变，执行器每次运行都会从中派生新的 [`Action`]，
//! 因此同一个序列可以被反复提交。
//!
//! # 示例
//!
//! ```rust,ignore
//! let home = ActionSequence::builder("Home")
//!     .action(|a| {
//!         a.rotate(&waist, 0.0).go_to(&elbow, 0);
//!     })
//!     .build()?;
//!
//! let wave = ActionSequence::builder("Wave")
//!     .action(|a| {
//!         a.rotate(&waist, 45.0).speed(ActionSpeed::Fast);
//!     })
//!     .then(&home)
//!     .build()?;
//! ```

use crate::action::Action;
use crate::actuator::{Actuator, Binding, ExecuteBinding, MovementBinding, Shared};
use crate::error::{PartsError, Result};
use crate::movement::{LinearMovement, OpenCloseMovement, RotationMovement, stop_check};
use crate::rotator::Rotator;
use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;

/// 请求速度
///
/// 每个速度对应一个固定的"每 tick 毫秒数"，具体数值由执行器配置决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionSpeed {
    VerySlow,
    Slow,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl ActionSpeed {
    pub const ALL: [ActionSpeed; 5] = [
        ActionSpeed::VerySlow,
        ActionSpeed::Slow,
        ActionSpeed::Normal,
        ActionSpeed::Fast,
        ActionSpeed::VeryFast,
    ];

    /// 默认的每 tick 毫秒数
    pub const fn default_tick_ms(self) -> u64 {
        match self {
            ActionSpeed::VerySlow => 100,
            ActionSpeed::Slow => 50,
            ActionSpeed::Normal => 15,
            ActionSpeed::Fast => 7,
            ActionSpeed::VeryFast => 2,
        }
    }
}

impl fmt::Display for ActionSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionSpeed::VerySlow => "very_slow",
            ActionSpeed::Slow => "slow",
            ActionSpeed::Normal => "normal",
            ActionSpeed::Fast => "fast",
            ActionSpeed::VeryFast => "very_fast",
        };
        f.write_str(name)
    }
}

/// 单个 Action 的执行计划（绑定列表 + 请求速度）
pub struct ActionPlan {
    bindings: Vec<Arc<dyn MovementBinding>>,
    speed: ActionSpeed,
}

impl ActionPlan {
    /// 派生一个新的 Action 实例
    pub fn action(&self) -> Action {
        Action::from_bindings(&self.bindings)
    }

    pub fn speed(&self) -> ActionSpeed {
        self.speed
    }

    /// 绑定数量
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for ActionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionPlan")
            .field("movements", &self.bindings.len())
            .field("speed", &self.speed)
            .finish()
    }
}

/// 动作序列
#[derive(Clone)]
pub struct ActionSequence {
    name: String,
    plans: Vec<Arc<ActionPlan>>,
}

impl ActionSequence {
    /// 空序列
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plans: Vec::new(),
        }
    }

    /// 使用 DSL 构建序列
    pub fn builder(name: impl Into<String>) -> SequenceBuilder {
        SequenceBuilder {
            sequence: Self::new(name),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plans(&self) -> &[Arc<ActionPlan>] {
        &self.plans
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// 把 `other` 的全部计划按顺序追加到末尾
    pub fn append(&mut self, other: &ActionSequence) {
        self.plans.extend(other.plans.iter().cloned());
    }
}

impl AddAssign<&ActionSequence> for ActionSequence {
    fn add_assign(&mut self, other: &ActionSequence) {
        self.append(other);
    }
}

impl fmt::Debug for ActionSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSequence")
            .field("name", &self.name)
            .field("plans", &self.plans)
            .finish()
    }
}

/// 序列构建器
///
/// 构建过程中的第一个错误会被记录下来，由 [`SequenceBuilder::build`] 返回。
pub struct SequenceBuilder {
    sequence: ActionSequence,
    error: Option<PartsError>,
}

impl SequenceBuilder {
    /// 追加一个 Action
    pub fn action(mut self, init: impl FnOnce(&mut ActionBuilder)) -> Self {
        let mut builder = ActionBuilder::default();
        init(&mut builder);
        match builder.finish() {
            Ok(plan) => self.sequence.plans.push(Arc::new(plan)),
            Err(e) => {
                self.error.get_or_insert(e);
            },
        }
        self
    }

    /// 追加另一个序列的全部 Action
    pub fn then(mut self, other: &ActionSequence) -> Self {
        self.sequence.append(other);
        self
    }

    /// # 错误
    /// 任一运动的配置或范围错误（`PartsError::Range` 等）
    pub fn build(self) -> Result<ActionSequence> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.sequence),
        }
    }
}

/// Action 构建器
///
/// 同一个执行器在一个 Action 中只能出现一次，后添加的运动替换先前的。
#[derive(Default)]
pub struct ActionBuilder {
    bindings: Vec<Arc<dyn MovementBinding>>,
    speed: ActionSpeed,
    error: Option<PartsError>,
}

impl ActionBuilder {
    /// 旋转到绝对角度
    pub fn rotate<R: Rotator>(&mut self, rotator: &Shared<R>, angle: f32) -> &mut Self {
        self.rotate_with(rotator, RotationMovement::to(angle))
    }

    /// 使用完整的旋转描述（相对角度、终止谓词）
    pub fn rotate_with<R: Rotator>(&mut self, rotator: &Shared<R>, movement: RotationMovement) -> &mut Self {
        self.bind(rotator, movement)
    }

    /// 正向旋转，直到 `check` 为真（或到达物理上限）
    pub fn forward_until<R, F>(&mut self, rotator: &Shared<R>, check: F) -> &mut Self
    where
        R: Rotator,
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let limit = rotator.lock().physical_range().map_or(f32::MAX, |(_, max)| max);
        self.bind(rotator, RotationMovement::to(limit).with_stop_check(stop_check(check)))
    }

    /// 反向旋转，直到 `check` 为真（或到达物理下限）
    pub fn backward_until<R, F>(&mut self, rotator: &Shared<R>, check: F) -> &mut Self
    where
        R: Rotator,
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let limit = rotator.lock().physical_range().map_or(-f32::MAX, |(min, _)| min);
        self.bind(rotator, RotationMovement::to(limit).with_stop_check(stop_check(check)))
    }

    /// 直线执行器：使用完整的运动描述
    pub fn extend<A>(&mut self, linear: &Shared<A>, movement: LinearMovement) -> &mut Self
    where
        A: Actuator<Movement = LinearMovement>,
    {
        self.bind(linear, movement)
    }

    /// 直线执行器：移动到百分比
    pub fn go_to<A>(&mut self, linear: &Shared<A>, percentage: i16) -> &mut Self
    where
        A: Actuator<Movement = LinearMovement>,
    {
        match LinearMovement::to(percentage) {
            Ok(movement) => self.bind(linear, movement),
            Err(e) => self.fail(e),
        }
    }

    /// 开合执行器
    pub fn set_open<A>(&mut self, switch: &Shared<A>, open: bool) -> &mut Self
    where
        A: Actuator<Movement = OpenCloseMovement>,
    {
        self.bind(switch, OpenCloseMovement::new(open))
    }

    /// 任意执行器与其运动
    pub fn drive<A: Actuator>(&mut self, actuator: &Shared<A>, movement: A::Movement) -> &mut Self {
        self.bind(actuator, movement)
    }

    /// 以代码块作为一个步骤，返回 `true` 表示完成
    pub fn execute<F>(&mut self, function: F) -> &mut Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.bindings
            .push(Arc::new(ExecuteBinding::new(stop_check(function))));
        self
    }

    /// 请求速度（默认 `Normal`）
    pub fn speed(&mut self, speed: ActionSpeed) -> &mut Self {
        self.speed = speed;
        self
    }

    fn bind<A: Actuator>(&mut self, actuator: &Shared<A>, movement: A::Movement) -> &mut Self {
        match Binding::new(actuator, movement) {
            Ok(binding) => {
                let binding: Arc<dyn MovementBinding> = Arc::new(binding);
                let key = binding.actuator_key();
                match self
                    .bindings
                    .iter_mut()
                    .find(|existing| existing.actuator_key().is_some() && existing.actuator_key() == key)
                {
                    Some(existing) => *existing = binding,
                    None => self.bindings.push(binding),
                }
                self
            },
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: PartsError) -> &mut Self {
        self.error.get_or_insert(error);
        self
    }

    fn finish(self) -> Result<ActionPlan> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(ActionPlan {
                bindings: self.bindings,
                speed: self.speed,
            }),
        }
    }
}
