//! 无硬件机械臂演示
//!
//! 用 Mock PWM 控制器和 Mock 步进电机搭一个四自由度小机械臂：
//! 底座（步进）、腰部和肘部（舵机旋转器）、伸缩杆（线性执行器）、夹爪（开合舵机）。
//!
//! ```bash
//! RUST_LOG=debug cargo run -p articulate-sdk --example arm_demo --features mock
//! ```

use articulate_hal::mock::{MockPwmBus, MockServo, MockStepper};
use articulate_sdk::executor::HookManager;
use articulate_sdk::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// 每个 Action 结束后把当前位置写入快照板
struct PositionPublisher {
    waist: Shared<ServoRotator<ServoChannel<MockPwmBus>>>,
    base: Shared<RotatorStepper<MockStepper>>,
    board: Arc<StateBoard<(f32, f32)>>,
}

impl ExecutorHooks for PositionPublisher {
    fn update_current_state(&self) {
        let waist = self.waist.lock().current();
        let base = self.base.lock().current();
        self.board.publish((waist, base));
    }

    fn post_execution(&self, sequence: &ActionSequence, outcome: &SequenceOutcome) {
        println!("   ⏹  {} finished: {:?}", sequence.name(), outcome);
    }
}

const CONFIG: &str = r#"
stop_timeout_ms = 2000
worker_name = "demo"

[speeds]
normal = 5
fast = 2
slow = 10
"#;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    articulate_sdk::init_logging();

    println!("🤖 Articulate - 机械臂演示（Mock 硬件）");
    println!("=========================\n");

    // ==================== 步骤 1: 硬件 ====================
    let pwm = share(MockPwmBus::new(16));
    let waist = shared(
        ServoRotator::new(
            ServoChannel::new(pwm.clone(), 0, ServoTrim::TOWERPRO_MG996R, 90.0)?,
            0.0..=180.0,
            0.0..=180.0,
        )?
        .with_delta(1.0)?,
    );
    let elbow = shared(
        ServoRotator::new(
            ServoChannel::new(pwm.clone(), 1, ServoTrim::TOWERPRO_SG90, 90.0)?,
            -45.0..=45.0,
            180.0..=0.0,
        )?
        .with_delta(2.0)?,
    );
    let base = shared(RotatorStepper::new(MockStepper::new(200), 1.0)?);
    let boom_servo = MockServo::new(10.0);
    let boom = shared(ServoLinearActuator::new(boom_servo.clone(), 10.0, 170.0)?);
    let claw = shared(ServoSwitch::new(MockServo::new(0.0), 60.0, 0.0)?);

    // ==================== 步骤 2: 序列 ====================
    let home = ActionSequence::builder("Home")
        .action(|a| {
            a.rotate(&waist, 90.0).rotate(&elbow, 0.0).go_to(&boom, 0);
        })
        .action(|a| {
            a.set_open(&claw, false).speed(ActionSpeed::Fast);
        })
        .build()?;

    let wave = ActionSequence::builder("Wave")
        .action(|a| {
            a.rotate(&waist, 45.0).rotate(&base, 30.0).go_to(&boom, 50);
        })
        .action(|a| {
            a.rotate(&elbow, 30.0).set_open(&claw, true).speed(ActionSpeed::Fast);
        })
        .action(|a| {
            a.rotate(&elbow, -30.0).set_open(&claw, false).speed(ActionSpeed::Fast);
        })
        .then(&home)
        .build()?;

    // ==================== 步骤 3: 执行器 ====================
    let board = Arc::new(StateBoard::new((0.0f32, 0.0f32)));
    let hooks = HookManager::new().with(Arc::new(PositionPublisher {
        waist: waist.clone(),
        base: base.clone(),
        board: board.clone(),
    }));
    let bus = Arc::new(EventBus::new());
    let completions = bus.subscribe("Executor.Sequences");

    let executor = SequenceExecutor::builder("arm")
        .config(ExecutorConfig::from_toml_str(CONFIG)?)
        .hooks(Arc::new(hooks))
        .event_bus(bus.clone())
        .build()?;

    println!("▶  Wave ({} actions)", wave.len());
    executor.submit(wave.clone())?;

    // 正在运行时再次提交会被拒绝
    if let Err(e) = executor.submit(home.clone()) {
        println!("   ⚠  {}", e);
    }

    let event = completions.recv_timeout(Duration::from_secs(30))?;
    println!("   ✅ completion event: {}", event.to_json()?);
    let (waist_angle, base_angle) = *board.load();
    println!("   waist={:.1}° base={:.1}° boom={}%", waist_angle, base_angle, boom.lock().current());

    // ==================== 步骤 4: 中途停止 ====================
    println!("\n▶  Wave again, stopping after 100ms");
    executor.submit(wave)?;
    std::thread::sleep(Duration::from_millis(100));
    executor.stop()?;
    println!("   state after stop: {}", executor.state());

    let metrics = executor.metrics();
    println!(
        "\n📊 accepted={} rejected={} completed={} cancelled={} ticks={} overruns={}",
        metrics.accepted, metrics.rejected, metrics.completed, metrics.cancelled, metrics.ticks, metrics.overruns
    );
    Ok(())
}
