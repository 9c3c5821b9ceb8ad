//! 执行器能力抽象
//!
//! [`Actuator`] 描述"接受一个 Movement 并朝目标迈出一步"的能力。
//! 每次调用最多产生一次物理写入，实际运动速度由上层的 tick 节拍决定。

use crate::error::Result;
use crate::movement::{Movement, StopCheck};
use parking_lot::Mutex;
use std::ops::DerefMut;
use std::sync::Arc;

/// 执行器共享句柄
///
/// 执行器在启动时构造一次，由多个 Action 计划引用；同一时刻只有正在运行的
/// 序列会锁住并驱动它（由执行引擎的单序列规则保证）。
pub type Shared<A> = Arc<Mutex<A>>;

/// 包装为共享句柄
pub fn shared<A: Actuator>(actuator: A) -> Shared<A> {
    Arc::new(Mutex::new(actuator))
}

/// 执行器
pub trait Actuator: Send + 'static {
    /// 可接受的运动类型
    type Movement: Movement;

    /// 解析后的绝对目标
    type Target: Copy + Send + 'static;

    /// 构建期校验（不依赖当前位置的部分）
    fn validate(&self, _movement: &Self::Movement) -> Result<()> {
        Ok(())
    }

    /// 解析运动目标（相对运动以当前位置为基准）
    fn resolve(&self, movement: &Self::Movement) -> Result<Self::Target>;

    /// 朝目标迈出一步，返回是否已到达
    fn advance(&mut self, target: Self::Target) -> Result<bool>;

    /// 一次完整的尝试：先检查终止谓词，再解析并推进
    ///
    /// 谓词为真时直接返回 `Ok(true)`，不会产生任何物理写入。
    /// 相对运动每次调用都以当前位置重新解析。
    fn attempt(&mut self, movement: &Self::Movement) -> Result<bool>
    where
        Self: Sized,
    {
        Attempt::new().run::<Self, _, _>(movement, move || self)
    }
}

/// 一次运行中的尝试状态
///
/// 目标在第一次推进时解析，之后保持不变。[`Actuator::attempt`] 和 Action
/// 槽位都经由这里推进执行器。
pub(crate) struct Attempt<T> {
    target: Option<T>,
}

impl<T: Copy> Attempt<T> {
    pub(crate) fn new() -> Self {
        Self { target: None }
    }

    /// 先检查终止谓词，为假时才通过 `acquire` 拿到执行器
    pub(crate) fn run<A, G, F>(&mut self, movement: &A::Movement, acquire: F) -> Result<bool>
    where
        A: Actuator<Target = T>,
        G: DerefMut<Target = A>,
        F: FnOnce() -> G,
    {
        if movement.should_stop() {
            return Ok(true);
        }

        let mut actuator = acquire();
        let target = match self.target {
            Some(target) => target,
            None => {
                let target = actuator.resolve(movement)?;
                self.target = Some(target);
                target
            },
        };
        actuator.advance(target)
    }
}

/// Action 中单个槽位的一次运行
pub(crate) trait Drive: Send {
    /// 推进一个 tick，返回是否完成
    fn tick(&mut self) -> Result<bool>;
}

/// (执行器, 运动) 绑定
///
/// 绑定本身不可变，可以被多次执行；每次执行通过 [`MovementBinding::start`]
/// 派生出新的 [`Drive`]。
pub(crate) trait MovementBinding: Send + Sync {
    /// 执行器身份（用于同一 Action 内去重）
    fn actuator_key(&self) -> Option<usize>;

    fn start(self: Arc<Self>) -> Box<dyn Drive>;
}

pub(crate) struct Binding<A: Actuator> {
    actuator: Shared<A>,
    movement: A::Movement,
}

impl<A: Actuator> Binding<A> {
    /// 创建绑定，并立即做构建期校验
    pub(crate) fn new(actuator: &Shared<A>, movement: A::Movement) -> Result<Self> {
        actuator.lock().validate(&movement)?;
        Ok(Self {
            actuator: Arc::clone(actuator),
            movement,
        })
    }
}

impl<A: Actuator> MovementBinding for Binding<A> {
    fn actuator_key(&self) -> Option<usize> {
        Some(Arc::as_ptr(&self.actuator) as *const () as usize)
    }

    fn start(self: Arc<Self>) -> Box<dyn Drive> {
        Box::new(BindingDrive {
            binding: self,
            attempt: Attempt::new(),
        })
    }
}

struct BindingDrive<A: Actuator> {
    binding: Arc<Binding<A>>,
    attempt: Attempt<A::Target>,
}

impl<A: Actuator> Drive for BindingDrive<A> {
    fn tick(&mut self) -> Result<bool> {
        let binding = &self.binding;
        self.attempt
            .run::<A, _, _>(&binding.movement, || binding.actuator.lock())
    }
}

/// 以代码块作为一个运动步骤
///
/// 闭包返回 `true` 表示该步骤完成（相当于一个"裸"终止谓词）。
pub(crate) struct ExecuteBinding {
    check: StopCheck,
}

impl ExecuteBinding {
    pub(crate) fn new(check: StopCheck) -> Self {
        Self { check }
    }
}

impl MovementBinding for ExecuteBinding {
    fn actuator_key(&self) -> Option<usize> {
        None
    }

    fn start(self: Arc<Self>) -> Box<dyn Drive> {
        Box::new(ExecuteDrive {
            check: Arc::clone(&self.check),
        })
    }
}

struct ExecuteDrive {
    check: StopCheck,
}

impl Drive for ExecuteDrive {
    fn tick(&mut self) -> Result<bool> {
        Ok((self.check)())
    }
}
