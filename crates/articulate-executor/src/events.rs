//! 完成事件与发布通道
//!
//! 序列结束时执行器发布 [`SequenceCompleted`]：
//! - 进程内：通过 [`EventBus`] 按主题分发给订阅者
//! - 跨进程（可选）：序列化为扁平 JSON，交给 [`RemotePublisher`]（例如 MQTT 客户端）

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// 序列完成事件
///
/// JSON 形式：`{"source":"arm","sequence":"Home"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCompleted {
    /// 执行器名称
    pub source: String,
    /// 序列名称
    pub sequence: String,
}

impl SequenceCompleted {
    pub fn new(source: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sequence: sequence.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// 远端发布错误
#[derive(Error, Debug)]
#[error("Publish to '{topic}' failed: {message}")]
pub struct PublishError {
    pub topic: String,
    pub message: String,
}

/// 跨进程消息发布（消息代理边界）
///
/// 在执行线程上调用，实现应当快速返回（排队或 `try_send`）。
pub trait RemotePublisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

/// 把发布的消息转发到 channel（测试和本地桥接）
pub struct ChannelPublisher {
    sender: Sender<(String, String)>,
}

impl ChannelPublisher {
    /// 创建发布器和对应的接收端
    pub fn new(capacity: usize) -> (Self, Receiver<(String, String)>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl RemotePublisher for ChannelPublisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.sender
            .try_send((topic.to_string(), payload.to_string()))
            .map_err(|e| PublishError {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }
}

/// 进程内发布/订阅总线
///
/// 每个订阅者拥有一个有界队列；队列满时丢弃该订阅者的这条消息，
/// 已断开的订阅者在发布时被清理。
pub struct EventBus<M> {
    capacity: usize,
    topics: RwLock<HashMap<String, Vec<Sender<M>>>>,
}

impl<M: Clone + Send> EventBus<M> {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// 指定每个订阅者的队列长度
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// 订阅主题
    pub fn subscribe(&self, topic: &str) -> Receiver<M> {
        let (tx, rx) = bounded(self.capacity);
        self.topics.write().entry(topic.to_string()).or_default().push(tx);
        rx
    }

    /// 发布消息，返回成功投递的订阅者数量
    pub fn publish(&self, topic: &str, message: M) -> usize {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(topic) else {
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|subscriber| match subscriber.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            },
            Err(TrySendError::Full(_)) => {
                warn!(topic, "Event subscriber queue full, message dropped");
                true
            },
            // 接收端已 drop
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }

    /// 主题当前的订阅者数量
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }
}

impl<M: Clone + Send> Default for EventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}
