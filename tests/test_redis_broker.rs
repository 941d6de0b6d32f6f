//! 验证写入 Redis 的记录布局与 Go 版本一致
//! Verifies that records written to Redis use the Go asynq layout
//!
//! 没有可用的 Redis 时跳过（`REDIS_URL`，默认 `redis://127.0.0.1:6379`）
//! Skipped when no Redis is reachable (`REDIS_URL`, default `redis://127.0.0.1:6379`)

use prost::Message;
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

use asynq_client::base::{keys, TaskState};
use asynq_client::proto::TaskMessage;
use asynq_client::redis::RedisConnectionConfig;
use asynq_client::{Client, Error, Task, TaskOption};

fn redis_url() -> String {
  std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn connect() -> Option<(Client, redis::aio::MultiplexedConnection)> {
  let config = RedisConnectionConfig::from_url(&redis_url()).ok()?;
  let client = match Client::new(config.clone()).await {
    Ok(client) => client,
    Err(_) => {
      println!("Skipping test - Redis not available");
      return None;
    }
  };
  let raw = redis::Client::open(config.connection_info).ok()?;
  let conn = raw.get_multiplexed_async_connection().await.ok()?;
  Some((client, conn))
}

/// 每个测试使用独立的队列，避免互相干扰
/// Each test uses its own queue so runs do not interfere
fn test_queue() -> String {
  format!("test-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_enqueue_writes_go_layout() -> Result<(), Box<dyn std::error::Error>> {
  let Some((client, mut conn)) = connect().await else {
    return Ok(());
  };
  let queue = test_queue();

  let info = client
    .enqueue(
      &Task::new("email:welcome", br#"{"user":42}"#),
      vec![TaskOption::queue(&queue)],
    )
    .await?;
  assert_eq!(info.state, TaskState::Pending);

  let task_key = keys::task_key(&queue, &info.id);
  let state: String = conn.hget(&task_key, "state").await?;
  assert_eq!(state, "pending");
  let encoded: Vec<u8> = conn.hget(&task_key, "msg").await?;
  let msg = TaskMessage::decode(encoded.as_slice())?;
  assert_eq!(msg.r#type, "email:welcome");
  assert_eq!(msg.retry, 25);
  assert_eq!(msg.timeout, 1800);

  let pending: Vec<String> = conn.lrange(keys::pending_key(&queue), 0, -1).await?;
  assert_eq!(pending, vec![info.id.clone()]);
  let registered: bool = conn.sismember(keys::ALL_QUEUES, &queue).await?;
  assert!(registered);

  let err = client
    .enqueue(
      &Task::new("email:welcome", b""),
      vec![TaskOption::queue(&queue), TaskOption::task_id(&info.id)],
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TaskIdConflict));

  let _: () = conn
    .del(vec![task_key, keys::pending_key(&queue)])
    .await?;
  let _: () = conn.srem(keys::ALL_QUEUES, &queue).await?;
  client.close().await?;
  Ok(())
}

#[tokio::test]
async fn test_schedule_unique_sets_guard_ttl() -> Result<(), Box<dyn std::error::Error>> {
  let Some((client, mut conn)) = connect().await else {
    return Ok(());
  };
  let queue = test_queue();
  let task = Task::new("digest:send", b"weekly");
  let opts = || {
    vec![
      TaskOption::queue(&queue),
      TaskOption::process_in(Duration::from_secs(3600)),
      TaskOption::unique(Duration::from_secs(600)),
    ]
  };

  let info = client.enqueue(&task, opts()).await?;
  assert_eq!(info.state, TaskState::Scheduled);

  let unique_key = info.unique_key.clone().unwrap_or_default();
  let ttl: i64 = conn.ttl(&unique_key).await?;
  assert!(ttl > 70 * 60 - 5 && ttl <= 70 * 60, "unexpected ttl {ttl}");

  let score: f64 = conn
    .zscore(keys::scheduled_key(&queue), &info.id)
    .await?;
  assert_eq!(score as i64, info.next_process_at.timestamp());

  let err = client.enqueue(&task, opts()).await.unwrap_err();
  assert!(matches!(err, Error::TaskDuplicate));

  let _: () = conn
    .del(vec![
      unique_key,
      keys::task_key(&queue, &info.id),
      keys::scheduled_key(&queue),
    ])
    .await?;
  let _: () = conn.srem(keys::ALL_QUEUES, &queue).await?;
  client.close().await?;
  Ok(())
}

#[tokio::test]
async fn test_closed_client_rejects_submission() -> Result<(), Box<dyn std::error::Error>> {
  let Some((client, _conn)) = connect().await else {
    return Ok(());
  };
  client.ping().await?;
  client.close().await?;
  let err = client
    .enqueue(&Task::new("t", b"p"), vec![TaskOption::queue(test_queue())])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ClientClosed));
  Ok(())
}
