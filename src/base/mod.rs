//! 经纪人模块
//! Broker module
//!
//! 定义了客户端对任务存储后端的要求
//! Defines what the client requires from the task storage backend

use crate::proto::TaskMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

pub mod constants;
pub mod keys;

pub use keys::TaskState;

/// 存储后端上报的错误信号
/// Error signals reported by the storage backend
#[derive(Error, Debug)]
pub enum BrokerError {
  /// 唯一键已存在且未过期
  /// The uniqueness key is already present and unexpired
  #[error("unique key already exists")]
  DuplicateTask,
  /// 任务 ID 已存在
  /// The task identifier is already present
  #[error("task id already exists")]
  TaskIdConflict,
  /// 连接已关闭
  /// The connection has been released
  #[error("broker is closed")]
  Closed,
  #[error(transparent)]
  Redis(#[from] redis::RedisError),
  #[error(transparent)]
  ProtoEncode(#[from] prost::EncodeError),
  /// 脚本返回了未知的结果码
  /// A script answered with an unknown status code
  #[error("unexpected reply {0}")]
  UnexpectedReply(i64),
}

/// 经纪人特性，定义了提交任务所需的原子操作
/// Broker trait, the atomic primitives needed to submit tasks
///
/// 对应 Go asynq 的 internal/base/base.go 中 Broker interface 的生产者部分
/// Corresponds to the producer half of the Broker interface in Go asynq's internal/base/base.go
///
/// 实现必须是并发安全的；唯一性冲突由实现原子地判定
/// Implementations must be safe for concurrent use and decide uniqueness conflicts atomically
#[async_trait]
pub trait Broker: Send + Sync {
  /// 测试连接 - Go: Ping
  /// Ping the connection - Go: Ping
  async fn ping(&self) -> Result<(), BrokerError>;

  /// 关闭连接，等待进行中的提交完成 - Go: Close
  /// Close the connection once in-flight submissions finish - Go: Close
  async fn close(&self) -> Result<(), BrokerError>;

  /// 将任务加入等待队列 - Go: Enqueue
  /// Enqueue a task as pending - Go: Enqueue
  async fn enqueue(&self, msg: &TaskMessage) -> Result<(), BrokerError>;

  /// 唯一键不存在时将任务加入等待队列 - Go: EnqueueUnique
  /// Enqueue a task as pending unless its unique key is live - Go: EnqueueUnique
  async fn enqueue_unique(&self, msg: &TaskMessage, ttl: Duration) -> Result<(), BrokerError>;

  /// 调度任务在指定时间执行 - Go: Schedule
  /// Schedule a task for a specific time - Go: Schedule
  async fn schedule(&self, msg: &TaskMessage, process_at: DateTime<Utc>)
    -> Result<(), BrokerError>;

  /// 唯一键不存在时调度任务 - Go: ScheduleUnique
  /// Schedule a task unless its unique key is live - Go: ScheduleUnique
  async fn schedule_unique(
    &self,
    msg: &TaskMessage,
    process_at: DateTime<Utc>,
    ttl: Duration,
  ) -> Result<(), BrokerError>;
}
