//! 执行器配置
//!
//! 可以从 TOML 加载，缺省字段使用默认值：
//!
//! ```toml
//! stop_timeout_ms = 5000
//! event_topic = "articulate/events"
//!
//! [speeds]
//! slow = 60
//! ```

use crate::error::{ExecutorError, Result};
use articulate_parts::ActionSpeed;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 速度表：每个 [`ActionSpeed`] 对应的每 tick 毫秒数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedTable {
    pub very_slow: u64,
    pub slow: u64,
    pub normal: u64,
    pub fast: u64,
    pub very_fast: u64,
}

impl SpeedTable {
    pub fn tick_ms(&self, speed: ActionSpeed) -> u64 {
        match speed {
            ActionSpeed::VerySlow => self.very_slow,
            ActionSpeed::Slow => self.slow,
            ActionSpeed::Normal => self.normal,
            ActionSpeed::Fast => self.fast,
            ActionSpeed::VeryFast => self.very_fast,
        }
    }
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            very_slow: ActionSpeed::VerySlow.default_tick_ms(),
            slow: ActionSpeed::Slow.default_tick_ms(),
            normal: ActionSpeed::Normal.default_tick_ms(),
            fast: ActionSpeed::Fast.default_tick_ms(),
            very_fast: ActionSpeed::VeryFast.default_tick_ms(),
        }
    }
}

/// 执行器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// 速度表
    pub speeds: SpeedTable,

    /// `stop()` 最长等待时间（毫秒），0 表示一直等待
    pub stop_timeout_ms: u64,

    /// `stop()` 轮询间隔（毫秒）
    pub stop_poll_ms: u64,

    /// 析构时等待执行线程退出的时间（毫秒）
    pub join_timeout_ms: u64,

    /// 完成事件的消息代理主题
    pub event_topic: String,

    /// 完成事件的进程内总线主题
    pub internal_topic: String,

    /// 执行线程名前缀
    pub worker_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            speeds: SpeedTable::default(),
            stop_timeout_ms: 5000,
            stop_poll_ms: 5,
            join_timeout_ms: 2000,
            event_topic: "articulate/events".to_string(),
            internal_topic: "Executor.Sequences".to_string(),
            worker_name: "articulate-exec".to_string(),
        }
    }
}

impl ExecutorConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ExecutorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ExecutorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ExecutorError::Config(e.to_string()))
    }

    /// 校验配置
    ///
    /// # 错误
    /// - 任一速度为 0
    /// - `stop_poll_ms` 为 0
    /// - 主题或线程名为空
    pub fn validate(&self) -> Result<()> {
        for speed in ActionSpeed::ALL {
            if self.speeds.tick_ms(speed) == 0 {
                return Err(ExecutorError::Config(format!(
                    "speed '{}' must be at least 1 ms per tick",
                    speed
                )));
            }
        }
        if self.stop_poll_ms == 0 {
            return Err(ExecutorError::Config("stop_poll_ms must be > 0".to_string()));
        }
        if self.event_topic.is_empty() || self.internal_topic.is_empty() {
            return Err(ExecutorError::Config("event topics must not be empty".to_string()));
        }
        if self.worker_name.is_empty() {
            return Err(ExecutorError::Config("worker_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// 指定速度的 tick 时长
    pub fn tick_for(&self, speed: ActionSpeed) -> Duration {
        Duration::from_millis(self.speeds.tick_ms(speed))
    }

    /// `None` 表示无限等待
    pub fn stop_timeout(&self) -> Option<Duration> {
        (self.stop_timeout_ms > 0).then(|| Duration::from_millis(self.stop_timeout_ms))
    }

    pub fn stop_poll(&self) -> Duration {
        Duration::from_millis(self.stop_poll_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
