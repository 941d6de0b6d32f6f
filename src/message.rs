//! 提交记录构建
//! Submission record builder

use crate::base::constants::DEFAULT_TIMEOUT;
use crate::base::keys;
use crate::option::ResolvedOptions;
use crate::proto::TaskMessage;
use crate::task::Task;
use std::time::Duration;

/// 由合并后的选项和任务构建提交记录
/// Build the submission record from a task and its composed options
///
/// 截止时间与超时都未设置时使用默认超时（30 分钟），保证每条记录都有执行时限。
/// 两者都设置时原样保留，由执行端以先到者为准。
/// When neither deadline nor timeout is set, the default timeout (30 minutes) applies so
/// every record has a bounded execution window. When both are set both are kept and
/// the executing side enforces whichever elapses first.
pub fn build_task_message(task: &Task, opts: &ResolvedOptions) -> TaskMessage {
  let deadline = opts.deadline.map(|t| t.timestamp()).unwrap_or(0);
  // 非零超时至少记为一秒，避免被当作未设置
  let timeout = match opts.timeout.filter(|d| !d.is_zero()) {
    Some(d) => whole_seconds(d).max(1),
    None if deadline == 0 => whole_seconds(DEFAULT_TIMEOUT),
    None => 0,
  };
  let unique_key = match opts.effective_unique_ttl() {
    Some(_) => keys::unique_key(&opts.queue, task.get_type(), task.get_payload()),
    None => String::new(),
  };

  TaskMessage {
    r#type: task.get_type().to_string(),
    payload: task.get_payload().to_vec(),
    id: opts.task_id.clone(),
    queue: opts.queue.clone(),
    retry: opts.max_retry,
    retried: 0,
    error_msg: String::new(),
    last_failed_at: 0,
    timeout,
    deadline,
    unique_key,
    retention: whole_seconds(opts.retention),
    completed_at: 0,
  }
}

/// 截断为整秒，超出 i64 范围时取最大值
/// Truncate to whole seconds, saturating at `i64::MAX`
pub(crate) fn whole_seconds(d: Duration) -> i64 {
  i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::option::{compose_options, TaskOption};
  use chrono::{DateTime, Utc};

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
  }

  fn build(task: &Task, opts: &[TaskOption]) -> TaskMessage {
    let resolved = compose_options(opts, now()).unwrap();
    build_task_message(task, &resolved)
  }

  #[test]
  fn test_default_timeout_when_nothing_set() {
    let task = Task::new("email:welcome", br#"{"user":42}"#);
    let msg = build(&task, &[]);
    assert_eq!(msg.timeout_duration(), Some(Duration::from_secs(1800)));
    assert_eq!(msg.deadline_at(), None);
    assert_eq!(msg.retry, 25);
    assert_eq!(msg.queue, "default");
    assert_eq!(msg.unique_key(), None);
  }

  #[test]
  fn test_zero_timeout_counts_as_unset() {
    let task = Task::new("t", b"p");
    let msg = build(&task, &[TaskOption::timeout(Duration::ZERO)]);
    assert_eq!(msg.timeout, 1800);
  }

  #[test]
  fn test_deadline_only_has_no_timeout() {
    let task = Task::new("t", b"p");
    let deadline = now() + chrono::Duration::hours(2);
    let msg = build(&task, &[TaskOption::deadline(deadline)]);
    assert_eq!(msg.deadline_at(), Some(deadline));
    assert_eq!(msg.timeout_duration(), None);
  }

  #[test]
  fn test_timeout_and_deadline_both_preserved() {
    let task = Task::new("t", b"p");
    let deadline = now() + chrono::Duration::minutes(30);
    let msg = build(
      &task,
      &[
        TaskOption::deadline(deadline),
        TaskOption::timeout(Duration::from_secs(20)),
      ],
    );
    assert_eq!(msg.deadline_at(), Some(deadline));
    assert_eq!(msg.timeout_duration(), Some(Duration::from_secs(20)));
  }

  #[test]
  fn test_unique_key_ignores_non_key_options() {
    let task = Task::new("email:welcome", br#"{"user":42}"#);
    let a = build(&task, &[TaskOption::unique(Duration::from_secs(60))]);
    let b = build(
      &task,
      &[
        TaskOption::unique(Duration::from_secs(300)),
        TaskOption::max_retry(1),
        TaskOption::timeout(Duration::from_secs(5)),
        TaskOption::deadline(now()),
        TaskOption::task_id("fixed"),
        TaskOption::retention(Duration::from_secs(60)),
      ],
    );
    assert!(a.unique_key().is_some());
    assert_eq!(a.unique_key, b.unique_key);

    let other = Task::new("email:welcome", br#"{"user":43}"#);
    let c = build(&other, &[TaskOption::unique(Duration::from_secs(60))]);
    assert_ne!(a.unique_key, c.unique_key);
  }

  #[test]
  fn test_retention_in_seconds() {
    let task = Task::new("t", b"p");
    let msg = build(&task, &[TaskOption::retention(Duration::from_millis(90_500))]);
    assert_eq!(msg.retention, 90);
  }

  #[test]
  fn test_sub_second_timeout_rounds_up() {
    let task = Task::new("t", b"p");
    let msg = build(&task, &[TaskOption::timeout(Duration::from_millis(500))]);
    assert_eq!(msg.timeout, 1);
    assert_eq!(msg.timeout_duration(), Some(Duration::from_secs(1)));

    let msg = build(&task, &[TaskOption::timeout(Duration::from_millis(1500))]);
    assert_eq!(msg.timeout, 1);
  }

  #[test]
  fn test_huge_durations_saturate() {
    let task = Task::new("t", b"p");
    let huge = Duration::from_secs(u64::MAX);
    let msg = build(
      &task,
      &[TaskOption::timeout(huge), TaskOption::retention(huge)],
    );
    assert_eq!(msg.timeout, i64::MAX);
    assert_eq!(msg.retention, i64::MAX);
    assert!(msg.timeout_duration().is_some());
    assert!(msg.retention_duration().is_some());
  }

  #[test]
  fn test_whole_seconds() {
    assert_eq!(whole_seconds(Duration::from_millis(999)), 0);
    assert_eq!(whole_seconds(Duration::from_secs(90)), 90);
    assert_eq!(whole_seconds(Duration::MAX), i64::MAX);
  }
}
