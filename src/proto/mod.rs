//! asynq 线协议消息
//! asynq wire protocol messages
//!
//! 字段编号与 Go asynq 的 internal/proto/asynq.proto 一致
//! Field numbers match Go asynq's internal/proto/asynq.proto

use chrono::{DateTime, Utc};
use std::time::Duration;

/// 提交记录，编码后写入存储后端
/// Submission record, encoded and written to the backing store
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskMessage {
  /// Type indicates the kind of the task to be performed.
  #[prost(string, tag = "1")]
  pub r#type: ::prost::alloc::string::String,
  /// Payload holds data needed to process the task.
  #[prost(bytes = "vec", tag = "2")]
  pub payload: ::prost::alloc::vec::Vec<u8>,
  /// Unique identifier for the task.
  #[prost(string, tag = "3")]
  pub id: ::prost::alloc::string::String,
  /// Name of the queue to which this task belongs.
  #[prost(string, tag = "4")]
  pub queue: ::prost::alloc::string::String,
  /// Max number of retries for this task.
  #[prost(int32, tag = "5")]
  pub retry: i32,
  /// Number of times this task has been retried so far.
  #[prost(int32, tag = "6")]
  pub retried: i32,
  /// Error message from the last failure.
  #[prost(string, tag = "7")]
  pub error_msg: ::prost::alloc::string::String,
  /// Time of last failure in Unix time.
  #[prost(int64, tag = "11")]
  pub last_failed_at: i64,
  /// Timeout specifies timeout in seconds. Zero means no timeout.
  #[prost(int64, tag = "8")]
  pub timeout: i64,
  /// Deadline specifies the deadline for the task in Unix time. Zero means no deadline.
  #[prost(int64, tag = "9")]
  pub deadline: i64,
  /// UniqueKey holds the redis key used for uniqueness lock. Empty if not unique.
  #[prost(string, tag = "10")]
  pub unique_key: ::prost::alloc::string::String,
  /// Retention period in seconds.
  #[prost(int64, tag = "12")]
  pub retention: i64,
  /// Time when the task completed in success in Unix time.
  #[prost(int64, tag = "13")]
  pub completed_at: i64,
}

impl TaskMessage {
  /// 截止时间，0 表示未设置
  /// Deadline, zero meaning none
  pub fn deadline_at(&self) -> Option<DateTime<Utc>> {
    if self.deadline == 0 {
      None
    } else {
      DateTime::from_timestamp(self.deadline, 0)
    }
  }

  /// 超时，0 表示未设置
  /// Timeout, zero meaning none
  pub fn timeout_duration(&self) -> Option<Duration> {
    if self.timeout <= 0 {
      None
    } else {
      Some(Duration::from_secs(self.timeout as u64))
    }
  }

  /// 保留期限，0 表示不保留
  /// Retention period, zero meaning none
  pub fn retention_duration(&self) -> Option<Duration> {
    if self.retention <= 0 {
      None
    } else {
      Some(Duration::from_secs(self.retention as u64))
    }
  }

  /// 唯一键，空字符串表示非唯一任务
  /// Unique key, empty meaning the task is not unique
  pub fn unique_key(&self) -> Option<&str> {
    if self.unique_key.is_empty() {
      None
    } else {
      Some(&self.unique_key)
    }
  }
}
