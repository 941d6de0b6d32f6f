//! 任务选项模块
//! Task option module
//!
//! 选项是不可变的、带类型的值，用于修改任务的处理行为；
//! 多个选项在提交时合并为一份 [`ResolvedOptions`]
//! Options are immutable, typed values that modify how a task is processed;
//! at submission time they are merged into a single [`ResolvedOptions`]

use crate::base::constants::{DEFAULT_MAX_RETRY, DEFAULT_QUEUE_NAME};
use crate::base::keys::validate_queue_name;
use crate::error::{Error, Result};
use crate::task::generate_task_id;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// 选项种类
/// Option kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
  MaxRetry,
  Queue,
  TaskId,
  Timeout,
  Deadline,
  Unique,
  ProcessAt,
  ProcessIn,
  Retention,
  /// 解析得到但当前版本不认识的选项
  /// An option parsed from text whose kind this version does not know
  Unrecognized,
}

/// 任务选项
/// Task option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOption {
  /// 最大重试次数
  /// Max number of retries
  MaxRetry(i32),
  /// 队列名称
  /// Queue name
  Queue(String),
  /// 任务 ID
  /// Task ID
  TaskId(String),
  /// 任务可运行的最长时间，零表示不限制
  /// How long the task may run, zero meaning no limit
  Timeout(Duration),
  /// 任务截止时间
  /// Task deadline
  Deadline(DateTime<Utc>),
  /// 唯一性 TTL
  /// Uniqueness TTL
  Unique(Duration),
  /// 绝对处理时间
  /// Absolute processing time
  ProcessAt(DateTime<Utc>),
  /// 相对于组合时刻的延迟
  /// Delay relative to the time options are composed
  ProcessIn(Duration),
  /// 成功后保留为已完成任务的时长
  /// How long the task is kept as completed after success
  Retention(Duration),
  /// 未知种类，组合时被忽略
  /// Unknown kind, ignored at composition
  Unrecognized { name: String, value: String },
}

impl TaskOption {
  /// 最大重试次数，负数按零处理
  /// Max retry count, negative values are treated as zero
  pub fn max_retry(n: i32) -> Self {
    Self::MaxRetry(n.max(0))
  }

  /// 指定任务进入的队列
  /// Queue the task is enqueued into
  pub fn queue<T: AsRef<str>>(name: T) -> Self {
    Self::Queue(name.as_ref().to_string())
  }

  /// 指定任务 ID
  /// Explicit task ID
  pub fn task_id<T: AsRef<str>>(id: T) -> Self {
    Self::TaskId(id.as_ref().to_string())
  }

  /// 超时；与截止时间同时存在时以先到者为准（由执行端判定）
  /// Timeout; when a deadline is also set, whichever elapses first applies (enforced by workers)
  pub fn timeout(d: Duration) -> Self {
    Self::Timeout(d)
  }

  /// 截止时间；与超时同时存在时以先到者为准（由执行端判定）
  /// Deadline; when a timeout is also set, whichever elapses first applies (enforced by workers)
  pub fn deadline(t: DateTime<Utc>) -> Self {
    Self::Deadline(t)
  }

  /// 在 TTL 内按 (队列, 类型, 负载) 去重
  /// De-duplicate on (queue, type, payload) within the TTL
  pub fn unique(ttl: Duration) -> Self {
    Self::Unique(ttl)
  }

  /// 与 ProcessIn 冲突时，后传入者生效
  /// When combined with ProcessIn, the one passed last wins
  pub fn process_at(t: DateTime<Utc>) -> Self {
    Self::ProcessAt(t)
  }

  /// 与 ProcessAt 冲突时，后传入者生效
  /// When combined with ProcessAt, the one passed last wins
  pub fn process_in(d: Duration) -> Self {
    Self::ProcessIn(d)
  }

  pub fn retention(d: Duration) -> Self {
    Self::Retention(d)
  }

  /// 获取选项种类
  /// Get the option kind
  pub fn option_type(&self) -> OptionType {
    match self {
      Self::MaxRetry(_) => OptionType::MaxRetry,
      Self::Queue(_) => OptionType::Queue,
      Self::TaskId(_) => OptionType::TaskId,
      Self::Timeout(_) => OptionType::Timeout,
      Self::Deadline(_) => OptionType::Deadline,
      Self::Unique(_) => OptionType::Unique,
      Self::ProcessAt(_) => OptionType::ProcessAt,
      Self::ProcessIn(_) => OptionType::ProcessIn,
      Self::Retention(_) => OptionType::Retention,
      Self::Unrecognized { .. } => OptionType::Unrecognized,
    }
  }

  /// 从字符串解析选项，格式与 Display 输出一致，例如 `Queue("critical")`、`Timeout(60s)`
  /// Parse an option from its Display form, e.g. `Queue("critical")`, `Timeout(60s)`
  pub fn parse(s: &str) -> Result<Self> {
    let s = s.trim();
    let (name, rest) = s
      .split_once('(')
      .ok_or_else(|| Error::InvalidOption(format!("invalid option format: {s}")))?;
    let value = rest
      .strip_suffix(')')
      .ok_or_else(|| Error::InvalidOption(format!("missing closing parenthesis: {s}")))?
      .trim();
    let name = name.trim();

    let opt = match name {
      "MaxRetry" => Self::max_retry(
        value
          .parse::<i32>()
          .map_err(|_| Error::InvalidOption(format!("invalid MaxRetry value: {value}")))?,
      ),
      "Queue" => Self::Queue(unquote(value)),
      "TaskID" => Self::TaskId(unquote(value)),
      "Timeout" => Self::Timeout(parse_duration(name, value)?),
      "Deadline" => Self::Deadline(parse_time(name, value)?),
      "Unique" => Self::Unique(parse_duration(name, value)?),
      "ProcessAt" => Self::ProcessAt(parse_time(name, value)?),
      "ProcessIn" => Self::ProcessIn(parse_duration(name, value)?),
      "Retention" => Self::Retention(parse_duration(name, value)?),
      _ if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) => {
        Self::Unrecognized {
          name: name.to_string(),
          value: value.to_string(),
        }
      }
      _ => return Err(Error::InvalidOption(format!("invalid option name: {name:?}"))),
    };
    Ok(opt)
  }
}

impl fmt::Display for TaskOption {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MaxRetry(n) => write!(f, "MaxRetry({n})"),
      Self::Queue(q) => write!(f, "Queue({q:?})"),
      Self::TaskId(id) => write!(f, "TaskID({id:?})"),
      Self::Timeout(d) => write!(f, "Timeout({}s)", d.as_secs()),
      Self::Deadline(t) => write!(f, "Deadline({})", t.to_rfc3339()),
      Self::Unique(d) => write!(f, "Unique({}s)", d.as_secs()),
      Self::ProcessAt(t) => write!(f, "ProcessAt({})", t.to_rfc3339()),
      Self::ProcessIn(d) => write!(f, "ProcessIn({}s)", d.as_secs()),
      Self::Retention(d) => write!(f, "Retention({}s)", d.as_secs()),
      Self::Unrecognized { name, value } => write!(f, "{name}({value})"),
    }
  }
}

fn unquote(value: &str) -> String {
  value.trim_matches('"').to_string()
}

fn parse_duration(name: &str, value: &str) -> Result<Duration> {
  value
    .strip_suffix('s')
    .unwrap_or(value)
    .parse::<u64>()
    .map(Duration::from_secs)
    .map_err(|_| Error::InvalidOption(format!("invalid {name} value: {value}")))
}

fn parse_time(name: &str, value: &str) -> Result<DateTime<Utc>> {
  if let Ok(t) = DateTime::parse_from_rfc3339(value) {
    return Ok(t.with_timezone(&Utc));
  }
  value
    .parse::<i64>()
    .ok()
    .and_then(|secs| DateTime::from_timestamp(secs, 0))
    .ok_or_else(|| Error::InvalidOption(format!("invalid {name} value: {value}")))
}

/// 合并后的任务选项，每个种类恰好有一个值
/// Composed task options, exactly one value per kind
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
  pub max_retry: i32,
  pub queue: String,
  pub task_id: String,
  /// 未设置时由记录构建阶段决定默认超时
  /// Left unset here; the record builder decides the default timeout
  pub timeout: Option<Duration>,
  pub deadline: Option<DateTime<Utc>>,
  pub unique_ttl: Option<Duration>,
  pub process_at: DateTime<Utc>,
  pub retention: Duration,
}

impl ResolvedOptions {
  /// 默认值：重试 25 次、默认队列、随机任务 ID、立即处理
  /// Defaults: 25 retries, default queue, random task ID, process immediately
  pub fn new(now: DateTime<Utc>) -> Self {
    Self {
      max_retry: DEFAULT_MAX_RETRY,
      queue: DEFAULT_QUEUE_NAME.to_string(),
      task_id: generate_task_id(),
      timeout: None,
      deadline: None,
      unique_ttl: None,
      process_at: now,
      retention: Duration::ZERO,
    }
  }

  /// 唯一性 TTL 大于零时才生效
  /// The uniqueness TTL only applies when greater than zero
  pub fn effective_unique_ttl(&self) -> Option<Duration> {
    self.unique_ttl.filter(|ttl| !ttl.is_zero())
  }
}

/// 按顺序合并选项，同一种类后者覆盖前者
/// Merge options in order, later options of a kind override earlier ones
///
/// 返回遇到的第一个校验错误；出错时不会暴露部分合并的结果
/// Returns the first validation error encountered; no partially composed value escapes
pub fn compose_options<'a, I>(opts: I, now: DateTime<Utc>) -> Result<ResolvedOptions>
where
  I: IntoIterator<Item = &'a TaskOption>,
{
  let mut res = ResolvedOptions::new(now);
  for opt in opts {
    match opt {
      TaskOption::MaxRetry(n) => res.max_retry = (*n).max(0),
      TaskOption::Queue(qname) => {
        validate_queue_name(qname)?;
        res.queue = qname.clone();
      }
      TaskOption::TaskId(id) => {
        if id.trim().is_empty() {
          return Err(Error::InvalidTaskId { id: id.clone() });
        }
        res.task_id = id.clone();
      }
      TaskOption::Timeout(d) => res.timeout = Some(*d),
      TaskOption::Deadline(t) => res.deadline = Some(*t),
      TaskOption::Unique(ttl) => res.unique_ttl = Some(*ttl),
      TaskOption::ProcessAt(t) => res.process_at = *t,
      TaskOption::ProcessIn(d) => {
        res.process_at = chrono::Duration::from_std(*d)
          .ok()
          .and_then(|delta| now.checked_add_signed(delta))
          .ok_or_else(|| Error::InvalidOption(format!("{opt} is out of range")))?;
      }
      TaskOption::Retention(d) => res.retention = *d,
      TaskOption::Unrecognized { name, .. } => {
        tracing::debug!("ignoring unrecognized task option {}", name);
      }
    }
  }
  Ok(res)
}
