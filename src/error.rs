//! 错误处理模块
//! Error handling module
//!
//! 定义了客户端对外暴露的错误类型，以及从存储后端信号到公共错误的映射
//! Defines the error types exposed by the client, and the mapping from
//! backing-store signals to the public error taxonomy

use crate::base::BrokerError;
use thiserror::Error;

/// 客户端的结果类型
/// Result type for the client
pub type Result<T> = std::result::Result<T, Error>;

/// 客户端错误类型
/// Client error type
#[derive(Error, Debug)]
pub enum Error {
  /// Redis connection error
  #[error("Redis connection error: {0}")]
  Redis(#[from] redis::RedisError),

  /// Protocol Buffer 编码错误
  /// Protocol buffer encoding error
  #[error("Protocol buffer encoding error: {0}")]
  ProtoEncode(#[from] prost::EncodeError),

  /// Protocol Buffer 解码错误
  /// Protocol buffer decoding error
  #[error("Protocol buffer decoding error: {0}")]
  ProtoDecode(#[from] prost::DecodeError),

  #[cfg(feature = "json")]
  /// 序列化错误
  /// Serialization error
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// 任务重复错误，仅在设置了唯一 TTL 时出现
  /// Task already exists, only reported for submissions with a uniqueness TTL
  #[error("task already exists")]
  TaskDuplicate,

  /// 任务 ID 冲突错误
  /// Task ID conflict error
  #[error("task ID conflicts with another task")]
  TaskIdConflict,

  /// 无效的队列名称
  /// Invalid queue name
  #[error("Invalid queue name: {name:?}")]
  InvalidQueueName { name: String },

  /// 无效的任务类型
  /// Invalid task type
  #[error("Invalid task type: {task_type:?}")]
  InvalidTaskType { task_type: String },

  /// 无效的任务 ID
  /// Invalid task ID
  #[error("Invalid task ID: {id:?}")]
  InvalidTaskId { id: String },

  /// 无效的选项字符串
  /// Invalid option string
  #[error("Invalid option: {0}")]
  InvalidOption(String),

  /// 客户端已关闭
  /// Client closed
  #[error("Client closed")]
  ClientClosed,

  /// 配置错误
  /// Configuration error
  #[error("Configuration error: {message}")]
  Config { message: String },

  /// Broker 错误
  /// Broker error
  #[error("Broker error: {0}")]
  Broker(String),
}

impl Error {
  /// 创建配置错误
  /// Create a configuration error
  pub fn config<S: Into<String>>(message: S) -> Self {
    Self::Config {
      message: message.into(),
    }
  }

  /// 创建 Broker 错误
  /// Create a broker error
  pub fn broker<S: Into<String>>(message: S) -> Self {
    Self::Broker(message.into())
  }

  /// 是否为提交前的校验错误（从不触达存储后端）
  /// Whether this is a pre-submission validation error (never reaches the store)
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Error::InvalidQueueName { .. }
        | Error::InvalidTaskType { .. }
        | Error::InvalidTaskId { .. }
        | Error::InvalidOption(_)
    )
  }

  /// 是否为唯一性冲突（重复任务或 ID 冲突），此时任务未被加入队列
  /// Whether this is a uniqueness conflict; the task was not enqueued
  pub fn is_conflict(&self) -> bool {
    matches!(self, Error::TaskDuplicate | Error::TaskIdConflict)
  }
}

/// 将存储后端的信号映射为公共错误类型
/// Maps backing-store signals into the public error taxonomy
///
/// 唯一键冲突与任务 ID 冲突保持区分，其余错误原样透传
/// Unique-key and task-ID conflicts stay distinct, everything else passes through
impl From<BrokerError> for Error {
  fn from(err: BrokerError) -> Self {
    match err {
      BrokerError::DuplicateTask => Error::TaskDuplicate,
      BrokerError::TaskIdConflict => Error::TaskIdConflict,
      BrokerError::Closed => Error::ClientClosed,
      BrokerError::Redis(e) => Error::Redis(e),
      BrokerError::ProtoEncode(e) => Error::ProtoEncode(e),
      BrokerError::UnexpectedReply(code) => {
        Error::broker(format!("unexpected script reply: {code}"))
      }
    }
  }
}
