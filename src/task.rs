//! 任务模块
//! Task module
//!
//! 定义了任务与提交结果相关的数据结构
//! Defines data structures for tasks and submission results

use crate::base::keys::TaskState;
#[cfg(feature = "json")]
use crate::error::Result;
use crate::option::TaskOption;
use crate::proto::TaskMessage;
use chrono::{DateTime, Utc};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 表示要执行的工作单元的任务
/// Represents a task as a unit of work to be executed
///
/// 任务类型在提交时校验，因此构造本身不会失败
/// The type name is validated at submission time, so construction never fails
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
  /// 任务类型名称
  /// Task type name
  task_type: String,
  /// 任务负载数据
  /// Task payload data
  payload: Vec<u8>,
  /// 构造时附加的默认选项，可被提交时的选项覆盖
  /// Default options attached at construction, overridable at submission
  options: Vec<TaskOption>,
}

impl Task {
  /// 创建新任务
  /// Create a new task
  pub fn new<T: AsRef<str>>(task_type: T, payload: &[u8]) -> Self {
    Self::new_with_options(task_type, payload, Vec::new())
  }

  /// 创建带默认选项的任务
  /// Create a task with default options
  pub fn new_with_options<T: AsRef<str>>(
    task_type: T,
    payload: &[u8],
    options: Vec<TaskOption>,
  ) -> Self {
    Self {
      task_type: task_type.as_ref().to_string(),
      payload: payload.to_vec(),
      options,
    }
  }

  #[cfg(feature = "json")]
  /// 使用 JSON 负载创建新任务
  /// Create a new task with JSON payload
  pub fn new_with_json<T: AsRef<str>, P: Serialize>(task_type: T, payload: &P) -> Result<Self> {
    let json_payload = serde_json::to_vec(payload)?;
    Ok(Self::new(task_type, &json_payload))
  }

  /// 追加一个默认选项
  /// Append a default option
  pub fn with_option(mut self, option: TaskOption) -> Self {
    self.options.push(option);
    self
  }

  /// 获取任务类型
  /// Get task type
  pub fn get_type(&self) -> &str {
    &self.task_type
  }

  /// 获取任务负载
  /// Get task payload
  pub fn get_payload(&self) -> &[u8] {
    &self.payload
  }

  /// 获取默认选项
  /// Get default options
  pub fn get_options(&self) -> &[TaskOption] {
    &self.options
  }

  #[cfg(feature = "json")]
  /// 获取任务负载作为 JSON
  /// Get task payload as JSON
  pub fn get_payload_with_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
    serde_json::from_slice(&self.payload).map_err(Into::into)
  }
}

/// 提交结果，描述已被存储后端接受的任务
/// Submission result, describing a task accepted by the backing store
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
  /// 任务标识符
  /// Task identifier
  pub id: String,
  /// 任务所属的队列名称
  /// Queue name to which the task belongs
  pub queue: String,
  /// 任务类型
  /// Task type
  pub task_type: String,
  /// 任务负载数据
  /// Task payload data
  pub payload: Vec<u8>,
  /// 任务状态，提交后为 pending 或 scheduled
  /// Task state, pending or scheduled right after submission
  pub state: TaskState,
  /// 任务最大重试次数
  /// Maximum retry attempts for the task
  pub max_retry: i32,
  /// 任务已重试次数
  /// Number of times the task has been retried
  pub retried: i32,
  /// 任务超时时间
  /// Task timeout duration
  pub timeout: Option<Duration>,
  /// 任务截止时间
  /// Task deadline
  pub deadline: Option<DateTime<Utc>>,
  /// 唯一键
  /// Uniqueness key
  pub unique_key: Option<String>,
  /// 实际使用的去重窗口，调度任务包含等待时间
  /// De-duplication window actually applied; includes the wait for scheduled tasks
  pub unique_ttl: Option<Duration>,
  /// 保留期限
  /// Retention period
  pub retention: Option<Duration>,
  /// 下次处理时间
  /// Next processing time
  pub next_process_at: DateTime<Utc>,
}

impl TaskInfo {
  /// 从 Protocol Buffer 消息创建任务信息
  /// Create task information from Protocol Buffer message
  pub fn from_proto(
    msg: &TaskMessage,
    state: TaskState,
    next_process_at: DateTime<Utc>,
    unique_ttl: Option<Duration>,
  ) -> Self {
    Self {
      id: msg.id.clone(),
      queue: msg.queue.clone(),
      task_type: msg.r#type.clone(),
      payload: msg.payload.clone(),
      state,
      max_retry: msg.retry,
      retried: msg.retried,
      timeout: msg.timeout_duration(),
      deadline: msg.deadline_at(),
      unique_key: msg.unique_key().map(str::to_string),
      unique_ttl,
      retention: msg.retention_duration(),
      next_process_at,
    }
  }
}

/// 生成任务 ID
/// Generate task ID
pub fn generate_task_id() -> String {
  Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_task_creation() {
    let task = Task::new("test_task", b"test payload");
    assert_eq!(task.get_type(), "test_task");
    assert_eq!(task.get_payload(), b"test payload");
    assert!(task.get_options().is_empty());
  }

  #[test]
  fn test_blank_type_is_constructible() {
    let task = Task::new("   ", b"");
    assert_eq!(task.get_type(), "   ");
  }

  #[test]
  fn test_task_with_options() {
    let task = Task::new("test_task", b"test payload")
      .with_option(TaskOption::queue("custom_queue"))
      .with_option(TaskOption::max_retry(10));

    assert_eq!(
      task.get_options(),
      &[TaskOption::queue("custom_queue"), TaskOption::max_retry(10)]
    );
  }

  #[cfg(feature = "json")]
  #[test]
  fn test_task_json_payload() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Welcome {
      user: i64,
    }

    let task = Task::new_with_json("email:welcome", &Welcome { user: 42 }).unwrap();
    assert_eq!(task.get_payload(), br#"{"user":42}"#);
    let decoded: Welcome = task.get_payload_with_json().unwrap();
    assert_eq!(decoded, Welcome { user: 42 });
  }

  #[test]
  fn test_task_id_generation() {
    let id1 = generate_task_id();
    let id2 = generate_task_id();

    assert_ne!(id1, id2);
    assert!(Uuid::parse_str(&id1).is_ok());
  }

  #[test]
  fn test_task_info_from_proto() {
    let msg = TaskMessage {
      r#type: "email:welcome".to_string(),
      id: "id-1".to_string(),
      queue: "default".to_string(),
      retry: 25,
      timeout: 1800,
      ..Default::default()
    };
    let now = Utc::now();
    let info = TaskInfo::from_proto(&msg, TaskState::Pending, now, None);
    assert_eq!(info.state, TaskState::Pending);
    assert_eq!(info.timeout, Some(Duration::from_secs(1800)));
    assert_eq!(info.deadline, None);
    assert_eq!(info.unique_key, None);
    assert_eq!(info.next_process_at, now);
  }
}
