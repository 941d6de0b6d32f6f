//! Redis 键名 - 与 Go 版本保持兼容
//! Redis key names - Compatible with Go version

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 所有队列名称的集合
/// Set of all queue names
pub const ALL_QUEUES: &str = "asynq:queues";

/// 任务状态
/// Task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
  /// 任务正在被处理
  /// Task is being processed
  Active,
  /// 任务准备好被处理
  /// Task is ready to be processed
  Pending,
  /// 任务被安排在将来某个时间处理
  /// Task is scheduled to be processed at a later time
  Scheduled,
  /// 任务之前失败了，安排在将来某个时间重试
  /// Task has failed before, scheduled to retry at a later time
  Retry,
  /// 任务被归档并存储以供检查
  /// Task is archived and stored for inspection
  Archived,
  /// 任务处理成功并保留到保留 TTL 过期
  /// Task is successfully processed and retained until retention TTL expires
  Completed,
}

impl TaskState {
  /// 将任务状态转换为字符串
  /// Convert task state to string
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Pending => "pending",
      Self::Scheduled => "scheduled",
      Self::Retry => "retry",
      Self::Archived => "archived",
      Self::Completed => "completed",
    }
  }
}

impl FromStr for TaskState {
  type Err = ();

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "active" => Ok(Self::Active),
      "pending" => Ok(Self::Pending),
      "scheduled" => Ok(Self::Scheduled),
      "retry" => Ok(Self::Retry),
      "archived" => Ok(Self::Archived),
      "completed" => Ok(Self::Completed),
      _ => Err(()),
    }
  }
}

impl std::fmt::Display for TaskState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// 校验队列名称 - 对应 Go 的 ValidateQueueName
/// Validate a queue name - Corresponds to Go's ValidateQueueName
pub fn validate_queue_name(qname: &str) -> Result<()> {
  if qname.trim().is_empty() {
    return Err(Error::InvalidQueueName {
      name: qname.to_string(),
    });
  }
  Ok(())
}

/// 生成队列键前缀 - 与 Go 版本兼容: asynq:{qname}:
/// Generate queue key prefix - Compatible with Go version: asynq:{qname}:
pub fn queue_key_prefix(qname: &str) -> String {
  format!("asynq:{{{}}}:", qname)
}

/// 生成任务键前缀
/// Generate task key prefix
pub fn task_key_prefix(qname: &str) -> String {
  format!("{}t:", queue_key_prefix(qname))
}

/// 生成任务键
/// Generate task key
pub fn task_key(qname: &str, id: &str) -> String {
  format!("{}{}", task_key_prefix(qname), id)
}

/// 生成等待队列键
/// Generate pending key
pub fn pending_key(qname: &str) -> String {
  format!("{}pending", queue_key_prefix(qname))
}

/// 生成调度队列键
/// Generate scheduled key
pub fn scheduled_key(qname: &str) -> String {
  format!("{}scheduled", queue_key_prefix(qname))
}

/// 生成唯一键 - 对应 Go 的 UniqueKey，使用 MD5 校验和
/// Generate unique key - Corresponds to Go's UniqueKey, using MD5 checksum
///
/// 只取决于队列、任务类型和负载；与重试、超时、截止时间、任务 ID 无关
/// Depends only on queue, task type and payload; never on retry, timeout, deadline or task ID
pub fn unique_key(qname: &str, task_type: &str, payload: &[u8]) -> String {
  if payload.is_empty() {
    return format!("{}unique:{}:", queue_key_prefix(qname), task_type);
  }

  let checksum = format!("{:x}", md5::compute(payload));
  format!(
    "{}unique:{}:{}",
    queue_key_prefix(qname),
    task_type,
    checksum
  )
}
