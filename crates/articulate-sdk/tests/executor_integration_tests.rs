//! 执行器端到端测试
//!
//! 验证：
//! 1. 并发提交只有一个被接受
//! 2. `stop()` 返回时执行器已空闲，设备不再被写入
//! 3. 取消后剩余 Action 全部跳过
//! 4. 每条退出路径都发布完成事件
//! 5. 设备故障 / panic 后执行器可以继续使用

use articulate_hal::mock::{MockServo, MockStepper};
use articulate_sdk::executor::{ChannelPublisher, EventBus, HookManager, StateBoard};
use articulate_sdk::prelude::*;
use parking_lot::Mutex;
use rand::Rng;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn quick_config() -> ExecutorConfig {
    let mut config = ExecutorConfig::default();
    config.speeds.normal = 2;
    config.speeds.fast = 1;
    config.stop_poll_ms = 1;
    config
}

fn servo_rotator(servo: &MockServo) -> Shared<ServoRotator<MockServo>> {
    shared(
        ServoRotator::new(servo.clone(), 0.0..=180.0, 0.0..=180.0)
            .unwrap()
            .with_delta(1.0)
            .unwrap(),
    )
}

/// 记录每个序列的结束结果
#[derive(Default)]
struct OutcomeRecorder {
    outcomes: Mutex<Vec<(String, SequenceOutcome)>>,
    updates: AtomicU32,
}

impl ExecutorHooks for OutcomeRecorder {
    fn post_execution(&self, sequence: &ActionSequence, outcome: &SequenceOutcome) {
        self.outcomes.lock().push((sequence.name().to_string(), outcome.clone()));
    }

    fn update_current_state(&self) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_concurrent_submissions_accept_exactly_one() {
    let executor = Arc::new(SequenceExecutor::builder("arm").config(quick_config()).build().unwrap());
    let release = Arc::new(AtomicBool::new(false));
    let gate = release.clone();
    let sequence = ActionSequence::builder("Hold")
        .action(move |a| {
            a.execute(move || gate.load(Ordering::SeqCst));
        })
        .build()
        .unwrap();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let executor = executor.clone();
            let barrier = barrier.clone();
            let sequence = sequence.clone();
            thread::spawn(move || {
                barrier.wait();
                executor.submit(sequence).is_ok()
            })
        })
        .collect();

    let accepted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
    assert_eq!(accepted, 1);

    release.store(true, Ordering::SeqCst);
    assert!(executor.wait_idle(WAIT));

    let metrics = executor.metrics();
    assert_eq!(metrics.accepted, 1);
    assert_eq!(metrics.rejected, 7);
    assert_eq!(metrics.completed, 1);
}

#[test]
#[serial]
fn test_stop_returns_only_when_idle() {
    let mut config = quick_config();
    config.speeds.slow = 10;
    let executor = SequenceExecutor::builder("arm").config(config).build().unwrap();
    let servo = MockServo::new(0.0);
    let waist = servo_rotator(&servo);

    let sweep = ActionSequence::builder("Sweep")
        .action(|a| {
            a.rotate(&waist, 180.0).speed(ActionSpeed::Slow);
        })
        .build()
        .unwrap();
    executor.submit(sweep).unwrap();
    thread::sleep(Duration::from_millis(100));

    executor.stop().unwrap();
    assert_eq!(executor.state(), ExecutorState::Idle);
    assert!(!executor.is_stop_requested());

    // 停止之后不再有设备写入
    let writes = servo.writes();
    assert!(writes > 0 && writes < 180);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(servo.writes(), writes);
}

#[test]
#[serial]
fn test_cancel_skips_remaining_actions() {
    let recorder = Arc::new(OutcomeRecorder::default());
    let mut config = quick_config();
    config.speeds.slow = 10;
    let executor = SequenceExecutor::builder("arm")
        .config(config)
        .hooks(recorder.clone())
        .build()
        .unwrap();

    let servo = MockServo::new(0.0);
    let waist = servo_rotator(&servo);
    let attempts = Arc::new(AtomicU32::new(0));
    let mut builder = ActionSequence::builder("FiveStep")
        .action(|a| {
            a.rotate(&waist, 10.0);
        })
        .action(|a| {
            a.rotate(&waist, 180.0).speed(ActionSpeed::Slow);
        });
    for _ in 0..3 {
        let attempts = attempts.clone();
        builder = builder.action(move |a| {
            a.execute(move || {
                attempts.fetch_add(1, Ordering::SeqCst);
                true
            });
        });
    }
    let sequence = builder.build().unwrap();
    assert_eq!(sequence.len(), 5);

    executor.submit(sequence).unwrap();
    thread::sleep(Duration::from_millis(150));
    executor.stop().unwrap();

    // 第二个 Action 已开始但未完成，后三个从未尝试
    assert!(servo.angle() > 10.0 && servo.angle() < 180.0);
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
    assert_eq!(
        *recorder.outcomes.lock(),
        vec![("FiveStep".to_string(), SequenceOutcome::Cancelled { skipped: 3 })]
    );
    assert!(executor.state().is_idle());
    assert!(!executor.is_stop_requested());
    assert_eq!(executor.metrics().cancelled, 1);
}

#[test]
fn test_busy_executor_rejects_second_sequence() {
    let bus = Arc::new(EventBus::new());
    let completions = bus.subscribe("Executor.Sequences");
    let executor = SequenceExecutor::builder("arm")
        .config(quick_config())
        .event_bus(bus.clone())
        .build()
        .unwrap();

    let servo = MockServo::new(0.0);
    let waist = servo_rotator(&servo);
    let home = ActionSequence::builder("Home")
        .action(|a| {
            a.rotate(&waist, 90.0);
        })
        .build()
        .unwrap();
    let wrist_servo = MockServo::new(0.0);
    let wrist = servo_rotator(&wrist_servo);
    let wave = ActionSequence::builder("Wave")
        .action(|a| {
            a.rotate(&waist, 45.0).rotate(&wrist, 45.0);
        })
        .build()
        .unwrap();

    executor.submit(home).unwrap();
    let rejected = executor.submit(wave);
    assert!(matches!(
        rejected,
        Err(ExecutorError::Rejected { ref executor, ref sequence }) if executor == "arm" && sequence == "Wave"
    ));

    let event = completions.recv_timeout(WAIT).unwrap();
    assert_eq!(event, SequenceCompleted::new("arm", "Home"));
    assert!(completions.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(servo.angle(), 90.0);
    assert_eq!(wrist_servo.writes(), 0);
}

#[test]
fn test_completion_event_on_every_exit_path() {
    let (publisher, remote) = ChannelPublisher::new(8);
    let bus = Arc::new(EventBus::new());
    let local = bus.subscribe("Executor.Sequences");
    let executor = SequenceExecutor::builder("turret")
        .config(quick_config())
        .event_bus(bus.clone())
        .remote_publisher(Arc::new(publisher))
        .build()
        .unwrap();

    // 正常完成
    let done = ActionSequence::builder("Done")
        .action(|a| {
            a.execute(|| true);
        })
        .build()
        .unwrap();
    executor.submit(done).unwrap();
    let (topic, payload) = remote.recv_timeout(WAIT).unwrap();
    assert_eq!(topic, "articulate/events");
    assert_eq!(payload, r#"{"source":"turret","sequence":"Done"}"#);

    // 取消
    let endless = ActionSequence::builder("Endless")
        .action(|a| {
            a.execute(|| false);
        })
        .build()
        .unwrap();
    executor.submit(endless).unwrap();
    executor.emergency_stop();
    let (_, payload) = remote.recv_timeout(WAIT).unwrap();
    assert_eq!(payload, r#"{"source":"turret","sequence":"Endless"}"#);

    // 故障
    let broken = ActionSequence::builder("Broken")
        .action(|a| {
            a.execute(|| panic!("sensor unplugged"));
        })
        .build()
        .unwrap();
    executor.submit(broken).unwrap();
    let (_, payload) = remote.recv_timeout(WAIT).unwrap();
    assert_eq!(payload, r#"{"source":"turret","sequence":"Broken"}"#);

    let names: Vec<String> = (0..3).map(|_| local.recv_timeout(WAIT).unwrap().sequence).collect();
    assert_eq!(names, ["Done", "Endless", "Broken"]);

    let metrics = executor.metrics();
    assert_eq!(metrics.completed, 1);
    assert_eq!(metrics.cancelled, 1);
    assert_eq!(metrics.faulted, 1);
    assert_eq!(metrics.finished(), 3);
}

#[test]
fn test_device_fault_recovers() {
    let recorder = Arc::new(OutcomeRecorder::default());
    let executor = SequenceExecutor::builder("arm")
        .config(quick_config())
        .hooks(recorder.clone())
        .build()
        .unwrap();

    let stepper = MockStepper::new(200);
    stepper.fail_after(10);
    let base = shared(RotatorStepper::new(stepper.clone(), 1.0).unwrap());
    let turn = ActionSequence::builder("Turn")
        .action(|a| {
            a.rotate(&base, 90.0);
        })
        .build()
        .unwrap();

    executor.submit(turn).unwrap();
    assert!(executor.wait_idle(WAIT));
    assert_eq!(stepper.position(), 10);
    {
        let outcomes = recorder.outcomes.lock();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0].1, SequenceOutcome::Faulted(reason) if reason.contains("mock stepper fault")));
    }

    // 执行器仍然可用
    let count = Arc::new(AtomicU32::new(0));
    let counter = count.clone();
    let next = ActionSequence::builder("Next")
        .action(move |a| {
            a.execute(move || counter.fetch_add(1, Ordering::SeqCst) >= 2);
        })
        .build()
        .unwrap();
    executor.submit(next).unwrap();
    assert!(executor.wait_idle(WAIT));
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert!(recorder.outcomes.lock()[1].1.is_completed());
}

#[test]
fn test_can_run_stops_between_actions() {
    struct Interlock {
        allow: AtomicBool,
    }
    impl ExecutorHooks for Interlock {
        fn can_run(&self) -> bool {
            self.allow.load(Ordering::SeqCst)
        }
    }

    let interlock = Arc::new(Interlock { allow: AtomicBool::new(true) });
    let recorder = Arc::new(OutcomeRecorder::default());
    let hooks = HookManager::new().with(interlock.clone()).with(recorder.clone());
    let executor = SequenceExecutor::builder("arm")
        .config(quick_config())
        .hooks(Arc::new(hooks))
        .build()
        .unwrap();

    // 第一个 Action 关闭联锁，第二个 Action 不应执行
    let ran_second = Arc::new(AtomicBool::new(false));
    let flag = ran_second.clone();
    let gate = interlock.clone();
    let sequence = ActionSequence::builder("Interlocked")
        .action(move |a| {
            a.execute(move || {
                gate.allow.store(false, Ordering::SeqCst);
                true
            });
        })
        .action(move |a| {
            a.execute(move || {
                flag.store(true, Ordering::SeqCst);
                true
            });
        })
        .build()
        .unwrap();

    executor.submit(sequence).unwrap();
    assert!(executor.wait_idle(WAIT));
    assert!(!ran_second.load(Ordering::SeqCst));
    assert_eq!(
        recorder.outcomes.lock()[0].1,
        SequenceOutcome::Cancelled { skipped: 1 }
    );
    // 第一个 Action 完成一次 + 序列结束一次
    assert_eq!(recorder.updates.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn test_action_respects_tick_budget() {
    let mut config = quick_config();
    config.speeds.normal = 15;
    let executor = SequenceExecutor::builder("arm").config(config).build().unwrap();

    let waist_servo = MockServo::new(0.0);
    let elbow_servo = MockServo::new(0.0);
    let waist = servo_rotator(&waist_servo);
    let elbow = servo_rotator(&elbow_servo);
    let sequence = ActionSequence::builder("Reach")
        .action(|a| {
            a.rotate(&waist, 10.0).rotate(&elbow, 5.0);
        })
        .build()
        .unwrap();

    let started = Instant::now();
    executor.submit(sequence).unwrap();
    assert!(executor.wait_idle(WAIT));

    // 10 个 tick，每个至少 15ms
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(waist_servo.angle(), 10.0);
    assert_eq!(elbow_servo.angle(), 5.0);
    assert_eq!(executor.metrics().ticks, 10);
}

#[test]
fn test_random_targets_reached() {
    let executor = SequenceExecutor::builder("arm").config(quick_config()).build().unwrap();
    let servo = MockServo::new(0.0);
    let waist = servo_rotator(&servo);
    let mut rng = rand::thread_rng();

    for _ in 0..3 {
        let target = rng.gen_range(1..=180) as f32;
        let sequence = ActionSequence::builder("Random")
            .action(|a| {
                a.rotate(&waist, target).speed(ActionSpeed::Fast);
            })
            .build()
            .unwrap();
        executor.submit(sequence).unwrap();
        assert!(executor.wait_idle(WAIT));
        assert_eq!(servo.angle(), target);
    }
}

#[test]
fn test_state_board_publishes_positions() {
    struct PositionHook {
        waist: Shared<ServoRotator<MockServo>>,
        board: Arc<StateBoard<f32>>,
    }
    impl ExecutorHooks for PositionHook {
        fn update_current_state(&self) {
            let current = self.waist.lock().current();
            self.board.publish(current);
        }
    }

    let servo = MockServo::new(0.0);
    let waist = servo_rotator(&servo);
    let board = Arc::new(StateBoard::new(0.0f32));
    let executor = SequenceExecutor::builder("arm")
        .config(quick_config())
        .hooks(Arc::new(PositionHook {
            waist: waist.clone(),
            board: board.clone(),
        }))
        .build()
        .unwrap();

    let sequence = ActionSequence::builder("TwoStops")
        .action(|a| {
            a.rotate(&waist, 30.0);
        })
        .action(|a| {
            a.rotate(&waist, 60.0);
        })
        .build()
        .unwrap();
    executor.submit(sequence).unwrap();
    assert!(executor.wait_idle(WAIT));

    // 两个 Action + 序列结束
    assert_eq!(board.version(), 3);
    assert_eq!(*board.load(), 60.0);
}
