use crate::base::{keys, Broker, BrokerError};
use crate::proto::TaskMessage;
use crate::rdb::redis_broker::ttl_seconds;
use crate::rdb::redis_scripts::RedisArg;
use crate::rdb::RedisBroker;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// RedisBroker 实现 Broker trait，提供与 Redis 的任务提交交互。
/// RedisBroker implements the Broker trait, providing task submission against Redis.
#[async_trait]
impl Broker for RedisBroker {
  /// 测试连接。
  /// Ping the server.
  async fn ping(&self) -> Result<(), BrokerError> {
    let mut conn = self.connection().await?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(())
  }

  /// 关闭连接。
  /// Close the connection.
  async fn close(&self) -> Result<(), BrokerError> {
    if self.release().await {
      tracing::info!("redis broker closed");
    }
    Ok(())
  }

  /// 将任务加入队列。
  /// Enqueue a task into the queue.
  async fn enqueue(&self, msg: &TaskMessage) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;
    let now_nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let script_keys = vec![
      keys::task_key(&msg.queue, &msg.id),
      keys::pending_key(&msg.queue),
    ];
    let args = vec![
      RedisArg::Bytes(encoded),
      RedisArg::Str(msg.id.clone()),
      RedisArg::Int(now_nanos),
    ];
    self.submit(&msg.queue, "enqueue", script_keys, args).await
  }

  /// 将任务以唯一方式加入队列，唯一键在 TTL 内有效。
  /// Enqueue a task uniquely; the unique key stays live for the TTL.
  async fn enqueue_unique(&self, msg: &TaskMessage, ttl: Duration) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;
    let now_nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let script_keys = vec![
      msg.unique_key.clone(),
      keys::task_key(&msg.queue, &msg.id),
      keys::pending_key(&msg.queue),
    ];
    let args = vec![
      RedisArg::Str(msg.id.clone()),
      RedisArg::Int(ttl_seconds(ttl)),
      RedisArg::Bytes(encoded),
      RedisArg::Int(now_nanos),
    ];
    self
      .submit(&msg.queue, "enqueue_unique", script_keys, args)
      .await
  }

  /// 调度任务在指定时间处理。
  /// Schedule a task to be processed at the given time.
  async fn schedule(&self, msg: &TaskMessage, process_at: DateTime<Utc>) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;

    let script_keys = vec![
      keys::task_key(&msg.queue, &msg.id),
      keys::scheduled_key(&msg.queue),
    ];
    let args = vec![
      RedisArg::Bytes(encoded),
      RedisArg::Int(process_at.timestamp()),
      RedisArg::Str(msg.id.clone()),
    ];
    self.submit(&msg.queue, "schedule", script_keys, args).await
  }

  /// 以唯一方式调度任务。
  /// Schedule a task uniquely.
  async fn schedule_unique(
    &self,
    msg: &TaskMessage,
    process_at: DateTime<Utc>,
    ttl: Duration,
  ) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;

    let script_keys = vec![
      msg.unique_key.clone(),
      keys::task_key(&msg.queue, &msg.id),
      keys::scheduled_key(&msg.queue),
    ];
    let args = vec![
      RedisArg::Str(msg.id.clone()),
      RedisArg::Int(ttl_seconds(ttl)),
      RedisArg::Int(process_at.timestamp()),
      RedisArg::Bytes(encoded),
    ];
    self
      .submit(&msg.queue, "schedule_unique", script_keys, args)
      .await
  }
}
