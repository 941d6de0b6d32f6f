//! 内存 Broker trait 实现
//! Memory Broker trait implementation
//!
//! 使用内存数据结构实现 Broker trait
//! Implements Broker trait using in-memory data structures

use crate::base::keys::TaskState;
use crate::base::{Broker, BrokerError};
use crate::memdb::MemoryBroker;
use crate::proto::TaskMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[async_trait]
impl Broker for MemoryBroker {
  /// 测试连接
  /// Ping the connection
  async fn ping(&self) -> Result<(), BrokerError> {
    let storage = self.storage.read().await;
    if storage.closed {
      return Err(BrokerError::Closed);
    }
    Ok(())
  }

  /// 关闭存储，等待持有锁的提交完成
  /// Close the store once submissions holding the lock are done
  async fn close(&self) -> Result<(), BrokerError> {
    let mut storage = self.storage.write().await;
    if !storage.closed {
      storage.closed = true;
      tracing::info!("memory broker closed");
    }
    Ok(())
  }

  /// 将任务加入队列
  /// Enqueue a task into the queue
  async fn enqueue(&self, msg: &TaskMessage) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;
    let mut guard = self.storage.write().await;
    let storage = guard.open()?;
    storage.get_or_create_queue(&msg.queue);

    storage.insert_task(msg, encoded, TaskState::Pending, None)?;
    storage
      .get_or_create_queue(&msg.queue)
      .pending
      .push(msg.id.clone());
    Ok(())
  }

  /// 将唯一任务加入队列
  /// Enqueue a unique task
  async fn enqueue_unique(&self, msg: &TaskMessage, ttl: Duration) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;
    let mut guard = self.storage.write().await;
    let storage = guard.open()?;
    storage.get_or_create_queue(&msg.queue);

    storage.insert_task(msg, encoded, TaskState::Pending, Some(ttl))?;
    storage
      .get_or_create_queue(&msg.queue)
      .pending
      .push(msg.id.clone());
    Ok(())
  }

  /// 调度任务
  /// Schedule a task
  async fn schedule(&self, msg: &TaskMessage, process_at: DateTime<Utc>) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;
    let mut guard = self.storage.write().await;
    let storage = guard.open()?;
    storage.get_or_create_queue(&msg.queue);

    storage.insert_task(msg, encoded, TaskState::Scheduled, None)?;
    storage
      .get_or_create_queue(&msg.queue)
      .scheduled
      .entry(process_at.timestamp())
      .or_default()
      .push(msg.id.clone());
    Ok(())
  }

  /// 调度唯一任务
  /// Schedule a unique task
  async fn schedule_unique(
    &self,
    msg: &TaskMessage,
    process_at: DateTime<Utc>,
    ttl: Duration,
  ) -> Result<(), BrokerError> {
    let encoded = self.encode_task_message(msg)?;
    let mut guard = self.storage.write().await;
    let storage = guard.open()?;
    storage.get_or_create_queue(&msg.queue);

    storage.insert_task(msg, encoded, TaskState::Scheduled, Some(ttl))?;
    storage
      .get_or_create_queue(&msg.queue)
      .scheduled
      .entry(process_at.timestamp())
      .or_default()
      .push(msg.id.clone());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::base::keys;

  fn message(id: &str, payload: &[u8]) -> TaskMessage {
    TaskMessage {
      r#type: "test:task".to_string(),
      payload: payload.to_vec(),
      id: id.to_string(),
      queue: "default".to_string(),
      retry: 25,
      timeout: 1800,
      unique_key: keys::unique_key("default", "test:task", payload),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_memory_broker_ping() {
    let broker = MemoryBroker::new();
    assert!(broker.ping().await.is_ok());
  }

  #[tokio::test]
  async fn test_memory_broker_enqueue() {
    let broker = MemoryBroker::new();
    let msg = message("a", b"test payload");

    broker.enqueue(&msg).await.unwrap();
    assert_eq!(broker.task_state("default", "a").await, Some(TaskState::Pending));
    assert_eq!(broker.pending_ids("default").await, vec!["a".to_string()]);
    assert_eq!(broker.queues().await, vec!["default".to_string()]);
    assert_eq!(broker.task_message("default", "a").await.unwrap(), Some(msg));
  }

  #[tokio::test]
  async fn test_memory_broker_enqueue_id_conflict() {
    let broker = MemoryBroker::new();
    broker.enqueue(&message("a", b"one")).await.unwrap();
    let result = broker.enqueue(&message("a", b"two")).await;
    assert!(matches!(result, Err(BrokerError::TaskIdConflict)));
    assert_eq!(broker.pending_ids("default").await.len(), 1);
  }

  #[tokio::test]
  async fn test_memory_broker_enqueue_unique() {
    let broker = MemoryBroker::new();
    let ttl = Duration::from_secs(60);

    broker.enqueue_unique(&message("a", b"payload"), ttl).await.unwrap();
    let result = broker.enqueue_unique(&message("b", b"payload"), ttl).await;
    assert!(matches!(result, Err(BrokerError::DuplicateTask)));
    assert_eq!(broker.task_state("default", "b").await, None);

    broker.enqueue_unique(&message("c", b"other"), ttl).await.unwrap();
  }

  #[tokio::test]
  async fn test_memory_broker_unique_key_expires() {
    let broker = MemoryBroker::new();
    let msg = message("a", b"payload");
    broker
      .enqueue_unique(&msg, Duration::from_millis(20))
      .await
      .unwrap();
    assert!(broker.is_unique_key_live(&msg.unique_key).await);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(!broker.is_unique_key_live(&msg.unique_key).await);
    assert_eq!(broker.cleanup_expired_unique_keys().await, 1);
    broker
      .enqueue_unique(&message("b", b"payload"), Duration::from_secs(60))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_memory_broker_unbounded_unique_ttl_never_expires() {
    let broker = MemoryBroker::new();
    let msg = message("a", b"payload");
    broker.enqueue_unique(&msg, Duration::MAX).await.unwrap();
    assert!(broker.is_unique_key_live(&msg.unique_key).await);
    assert_eq!(broker.cleanup_expired_unique_keys().await, 0);

    let result = broker
      .schedule_unique(&message("b", b"payload"), Utc::now(), Duration::MAX)
      .await;
    assert!(matches!(result, Err(BrokerError::DuplicateTask)));
  }

  #[tokio::test]
  async fn test_memory_broker_schedule() {
    let broker = MemoryBroker::new();
    let at = DateTime::from_timestamp(Utc::now().timestamp() + 3600, 0).unwrap();

    broker.schedule(&message("a", b"p"), at).await.unwrap();
    assert_eq!(broker.task_state("default", "a").await, Some(TaskState::Scheduled));
    assert_eq!(broker.scheduled_at("default", "a").await, Some(at));
    assert!(broker.pending_ids("default").await.is_empty());
  }

  #[tokio::test]
  async fn test_memory_broker_schedule_unique() {
    let broker = MemoryBroker::new();
    let at = Utc::now() + chrono::Duration::hours(1);
    let ttl = Duration::from_secs(4200);

    broker.schedule_unique(&message("a", b"p"), at, ttl).await.unwrap();
    let result = broker.enqueue_unique(&message("b", b"p"), ttl).await;
    assert!(matches!(result, Err(BrokerError::DuplicateTask)));
  }

  #[tokio::test]
  async fn test_memory_broker_close() {
    let broker = MemoryBroker::new();
    broker.close().await.unwrap();
    assert!(matches!(broker.ping().await, Err(BrokerError::Closed)));
    assert!(matches!(
      broker.enqueue(&message("a", b"p")).await,
      Err(BrokerError::Closed)
    ));
    // 重复关闭不报错
    broker.close().await.unwrap();
  }
}
