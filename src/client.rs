//! 客户端模块
//! Client module
//!
//! 提供任务提交功能：合并选项、构建提交记录、选择存储原语并映射结果
//! Provides task submission: compose options, build the record, pick the store primitive
//! and map its outcome

use crate::base::keys::TaskState;
use crate::base::Broker;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::message::build_task_message;
use crate::option::{compose_options, TaskOption};
use crate::rdb::RedisBroker;
use crate::redis::RedisConnectionConfig;
use crate::task::{Task, TaskInfo};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// 提交路由，由处理时间和唯一性决定使用哪个存储原语
/// Submission route: which store primitive handles the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  /// 立即入队
  /// Enqueue as pending
  Enqueue,
  /// 唯一键不存在时立即入队
  /// Enqueue as pending unless the unique key is live
  EnqueueUnique { ttl: Duration },
  /// 延迟到指定时间
  /// Defer until the given time
  Schedule { at: DateTime<Utc> },
  /// 唯一键不存在时延迟到指定时间，ttl 已包含等待时间
  /// Defer unless the unique key is live; the ttl already covers the wait
  ScheduleUnique { at: DateTime<Utc>, ttl: Duration },
}

impl Route {
  /// 选择路由
  /// Select the route
  ///
  /// 处理时间不晚于当前时刻的任务立即入队；否则延迟。延迟的唯一任务的去重窗口
  /// 从现在算起，覆盖等待时间加上唯一性 TTL。
  /// A task due no later than `now` is enqueued right away, otherwise it is deferred.
  /// For a deferred unique task the guard window runs from `now` and spans the wait plus
  /// the uniqueness TTL.
  pub fn select(process_at: DateTime<Utc>, unique_ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
    if process_at <= now {
      return match unique_ttl {
        Some(ttl) => Route::EnqueueUnique { ttl },
        None => Route::Enqueue,
      };
    }
    match unique_ttl {
      Some(ttl) => {
        let wait = (process_at - now).to_std().unwrap_or_default();
        Route::ScheduleUnique {
          at: process_at,
          ttl: wait.saturating_add(ttl),
        }
      }
      None => Route::Schedule { at: process_at },
    }
  }

  /// 提交成功后的任务状态
  /// Task state after a successful submission
  pub fn state(&self) -> TaskState {
    match self {
      Route::Enqueue | Route::EnqueueUnique { .. } => TaskState::Pending,
      Route::Schedule { .. } | Route::ScheduleUnique { .. } => TaskState::Scheduled,
    }
  }

  /// 实际处理时间，立即入队的任务为当前时刻
  /// Effective processing time; `now` for immediate routes
  pub fn effective_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    match self {
      Route::Enqueue | Route::EnqueueUnique { .. } => now,
      Route::Schedule { at } | Route::ScheduleUnique { at, .. } => *at,
    }
  }

  /// 实际使用的去重窗口
  /// Guard window actually applied
  pub fn unique_ttl(&self) -> Option<Duration> {
    match self {
      Route::EnqueueUnique { ttl } | Route::ScheduleUnique { ttl, .. } => Some(*ttl),
      Route::Enqueue | Route::Schedule { .. } => None,
    }
  }
}

/// Asynq 客户端，负责提交任务
/// Asynq client, responsible for submitting tasks
///
/// 客户端可在多个任务间共享；它只持有存储句柄和不可变配置
/// The client is shared freely across tasks; it holds only the store handle and immutable config
#[derive(Clone)]
pub struct Client {
  broker: Arc<dyn Broker>,
  config: ClientConfig,
}

impl Client {
  /// 创建新的客户端实例
  /// Create a new client instance
  pub async fn new(redis_connection: RedisConnectionConfig) -> Result<Self> {
    Self::with_config(redis_connection, ClientConfig::default()).await
  }

  /// 使用指定配置创建客户端实例
  /// Create a client instance with the specified configuration
  pub async fn with_config(
    redis_connection: RedisConnectionConfig,
    config: ClientConfig,
  ) -> Result<Self> {
    let broker = RedisBroker::new(redis_connection, &config).await?;
    Ok(Self {
      broker: Arc::new(broker),
      config,
    })
  }

  /// 绑定任意存储后端
  /// Bind any store
  pub fn with_broker(broker: Arc<dyn Broker>) -> Self {
    Self {
      broker,
      config: ClientConfig::default(),
    }
  }

  /// 获取存储后端
  /// Get the store handle
  pub fn broker(&self) -> Arc<dyn Broker> {
    self.broker.clone()
  }

  /// 获取配置
  /// Get the configuration
  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  /// 提交任务
  /// Submit a task
  ///
  /// 任务自带的选项先生效，调用时传入的选项随后覆盖。校验失败时不会访问存储后端；
  /// 存储后端的唯一性冲突映射为 [`Error::TaskDuplicate`]，ID 冲突映射为
  /// [`Error::TaskIdConflict`]。
  /// The task's own options apply first and the call's options override them. Validation
  /// failures never reach the store; a live uniqueness key maps to [`Error::TaskDuplicate`]
  /// and a reused identifier to [`Error::TaskIdConflict`].
  pub async fn enqueue(&self, task: &Task, opts: Vec<TaskOption>) -> Result<TaskInfo> {
    if task.get_type().trim().is_empty() {
      return Err(Error::InvalidTaskType {
        task_type: task.get_type().to_string(),
      });
    }

    let resolved = compose_options(task.get_options().iter().chain(opts.iter()), Utc::now())?;
    let msg = build_task_message(task, &resolved);

    let now = Utc::now();
    let route = Route::select(resolved.process_at, resolved.effective_unique_ttl(), now);
    tracing::debug!(
      "submitting task {} to queue {} via {:?}",
      msg.id,
      msg.queue,
      route
    );

    let outcome = match route {
      Route::Enqueue => self.broker.enqueue(&msg).await,
      Route::EnqueueUnique { ttl } => self.broker.enqueue_unique(&msg, ttl).await,
      Route::Schedule { at } => self.broker.schedule(&msg, at).await,
      Route::ScheduleUnique { at, ttl } => self.broker.schedule_unique(&msg, at, ttl).await,
    };

    if let Err(err) = outcome {
      let err = Error::from(err);
      if err.is_conflict() {
        tracing::warn!("task {} not enqueued to {}: {}", msg.id, msg.queue, err);
      }
      return Err(err);
    }

    Ok(TaskInfo::from_proto(
      &msg,
      route.state(),
      route.effective_time(now),
      route.unique_ttl(),
    ))
  }

  /// Ping 存储后端
  /// Ping the store
  pub async fn ping(&self) -> Result<()> {
    self.broker.ping().await.map_err(Into::into)
  }

  /// 关闭客户端，进行中的提交完成后释放连接
  /// Close the client; the connection is released once in-flight submissions finish
  pub async fn close(&self) -> Result<()> {
    self.broker.close().await.map_err(Into::into)
  }
}
