//! Redis 经纪人实现
//! Redis broker implementation
//!
//! 实现基于 Redis 的任务提交
//! Implements task submission on top of Redis

use crate::base::{keys, BrokerError};
use crate::config::ClientConfig;
use crate::message::whole_seconds;
use crate::error::Result;
use crate::proto::TaskMessage;
use crate::rdb::redis_scripts::{script_reply, RedisArg, ScriptManager};
use crate::redis::RedisConnectionConfig;
use prost::Message;
use redis::aio::MultiplexedConnection;
use redis::{AsyncConnectionConfig, Client};
use std::time::Duration;
use tokio::sync::RwLock;

/// Redis 经纪人实现
/// Redis broker implementation
///
/// 多路复用连接本身可克隆并在任务间共享；关闭后连接槽被清空
/// The multiplexed connection is clonable and shared across tasks; closing empties the slot
pub struct RedisBroker {
  conn: RwLock<Option<MultiplexedConnection>>,
  pub(crate) script_manager: ScriptManager,
}

impl RedisBroker {
  /// 建立连接并预加载提交脚本
  /// Connect and preload the submission scripts
  pub async fn new(redis_config: RedisConnectionConfig, config: &ClientConfig) -> Result<Self> {
    config.validate()?;
    let client = Client::open(redis_config.connection_info)?;
    let conn_config = AsyncConnectionConfig::new()
      .set_connection_timeout(config.connection_timeout)
      .set_response_timeout(config.response_timeout);
    let mut conn = client
      .get_multiplexed_async_connection_with_config(&conn_config)
      .await?;

    let mut script_manager = ScriptManager::default();
    script_manager.load_scripts(&mut conn).await?;
    tracing::debug!("connected to redis at {}", client.get_connection_info().addr);

    Ok(Self {
      conn: RwLock::new(Some(conn)),
      script_manager,
    })
  }

  /// 编码任务消息
  /// Encode the task message
  pub(crate) fn encode_task_message(&self, msg: &TaskMessage) -> std::result::Result<Vec<u8>, BrokerError> {
    let mut buf = Vec::with_capacity(msg.encoded_len());
    msg.encode(&mut buf)?;
    Ok(buf)
  }

  /// 在连接槽的读锁下运行一次提交，关闭操作会等待它完成
  /// Run one submission under the read guard of the connection slot; close waits for it
  pub(crate) async fn submit(
    &self,
    queue: &str,
    script_name: &str,
    script_keys: Vec<String>,
    args: Vec<RedisArg>,
  ) -> std::result::Result<(), BrokerError> {
    let guard = self.conn.read().await;
    let mut conn = guard.as_ref().ok_or(BrokerError::Closed)?.clone();

    // 确保队列在全局队列集合中注册
    // Ensure the queue is registered in the global queue set
    redis::cmd("SADD")
      .arg(keys::ALL_QUEUES)
      .arg(queue)
      .query_async::<()>(&mut conn)
      .await?;

    let code: i64 = self
      .script_manager
      .eval_script(&mut conn, script_name, &script_keys, &args)
      .await?;
    script_reply(code)
  }

  /// 在读锁下获取一个连接句柄
  /// Take a connection handle under the read guard
  pub(crate) async fn connection(&self) -> std::result::Result<MultiplexedConnection, BrokerError> {
    let guard = self.conn.read().await;
    guard.as_ref().cloned().ok_or(BrokerError::Closed)
  }

  /// 释放连接，之后的所有操作返回 [`BrokerError::Closed`]
  /// Release the connection; every later operation returns [`BrokerError::Closed`]
  pub(crate) async fn release(&self) -> bool {
    let mut guard = self.conn.write().await;
    guard.take().is_some()
  }
}

/// Redis 以毫秒绝对时间保存过期时间，换算后加上当前时间不得溢出
/// Redis keeps expiries as absolute milliseconds; converted plus now must not overflow
const MAX_EXPIRE_SECS: i64 = i64::MAX / 2000;

/// Redis 只接受整秒的过期时间，不足一秒按一秒计，过长的按上限计
/// Redis expiries are whole seconds; shorter counts as one second, longer is capped
pub(crate) fn ttl_seconds(ttl: Duration) -> i64 {
  whole_seconds(ttl).clamp(1, MAX_EXPIRE_SECS)
}
