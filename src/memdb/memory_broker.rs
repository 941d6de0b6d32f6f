//! 内存经纪人实现
//! Memory broker implementation
//!
//! 使用内存数据结构实现任务存储，不依赖任何外部服务
//! Implements task storage using in-memory data structures without any external service dependencies

use crate::base::keys::TaskState;
use crate::base::BrokerError;
use crate::error::{Error, Result};
use crate::proto::TaskMessage;
use chrono::{DateTime, Utc};
use prost::Message;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// 内存中的任务数据
/// In-memory task data
#[derive(Clone)]
pub struct TaskData {
  /// 编码后的任务消息
  /// Encoded task message
  pub encoded: Vec<u8>,
  /// 任务状态
  /// Task state
  pub state: TaskState,
  /// 唯一键（唯一提交时设置）
  /// Unique key, set by unique submissions
  pub unique_key: Option<String>,
}

/// 队列数据结构
/// Queue data structure
#[derive(Default)]
pub struct QueueData {
  /// 待处理任务，按入队顺序
  /// Pending tasks in submission order
  pub pending: Vec<String>,
  /// 调度任务 (scheduled) - 按处理时间排序
  /// Scheduled tasks - sorted by process time
  pub scheduled: BTreeMap<i64, Vec<String>>,
}

/// 内存存储
/// Memory storage
#[derive(Default)]
pub struct MemoryStorage {
  /// 所有队列名称
  /// All queue names
  pub queues: HashSet<String>,
  /// 每个队列的数据
  /// Data for each queue
  pub queue_data: HashMap<String, QueueData>,
  /// 任务数据 - key: queue:task_id
  /// Task data - key: queue:task_id
  pub tasks: HashMap<String, TaskData>,
  /// 唯一键映射 - key: unique_key, value: (task_id, expires_at)；None 表示永不过期
  /// Unique key mapping - key: unique_key, value: (task_id, expires_at); None never expires
  pub unique_keys: HashMap<String, (String, Option<Instant>)>,
  /// 是否已关闭
  /// Whether the store has been closed
  pub closed: bool,
}

impl MemoryStorage {
  /// 获取或创建队列数据
  /// Get or create queue data
  pub fn get_or_create_queue(&mut self, queue: &str) -> &mut QueueData {
    self.queues.insert(queue.to_string());
    self.queue_data.entry(queue.to_string()).or_default()
  }

  /// 生成任务键
  /// Generate task key
  pub fn task_key(queue: &str, task_id: &str) -> String {
    format!("{queue}:{task_id}")
  }

  /// 未关闭时返回自身
  /// Return self unless closed
  pub(crate) fn open(&mut self) -> std::result::Result<&mut Self, BrokerError> {
    if self.closed {
      Err(BrokerError::Closed)
    } else {
      Ok(self)
    }
  }

  /// 唯一键是否仍在有效期内
  /// Whether the unique key is still live
  pub(crate) fn unique_key_live(&self, unique_key: &str, now: Instant) -> bool {
    self
      .unique_keys
      .get(unique_key)
      .is_some_and(|(_, expires_at)| expires_at.is_none_or(|at| at > now))
  }

  /// 按与 Redis 脚本相同的顺序检查唯一键与任务 ID，然后写入任务
  /// Check the unique key and the task id in the same order as the Redis scripts, then store the task
  pub(crate) fn insert_task(
    &mut self,
    msg: &TaskMessage,
    encoded: Vec<u8>,
    state: TaskState,
    unique_ttl: Option<Duration>,
  ) -> std::result::Result<(), BrokerError> {
    let now = Instant::now();
    if unique_ttl.is_some() && self.unique_key_live(&msg.unique_key, now) {
      return Err(BrokerError::DuplicateTask);
    }

    let task_key = Self::task_key(&msg.queue, &msg.id);
    if self.tasks.contains_key(&task_key) {
      return Err(BrokerError::TaskIdConflict);
    }

    let unique_key = match unique_ttl {
      Some(ttl) => {
        self
          .unique_keys
          .insert(msg.unique_key.clone(), (msg.id.clone(), now.checked_add(ttl)));
        Some(msg.unique_key.clone())
      }
      None => None,
    };

    self.tasks.insert(
      task_key,
      TaskData {
        encoded,
        state,
        unique_key,
      },
    );
    Ok(())
  }
}

/// 内存经纪人实现
/// Memory broker implementation
///
/// 所有原语都在存储写锁下完成，因此唯一性判定是原子的
/// Every primitive runs under the storage write lock, so uniqueness decisions are atomic
#[derive(Default)]
pub struct MemoryBroker {
  /// 内存存储
  /// Memory storage
  pub(crate) storage: RwLock<MemoryStorage>,
}

impl MemoryBroker {
  /// 创建新的内存经纪人实例
  /// Create a new memory broker instance
  pub fn new() -> Self {
    Self::default()
  }

  /// 将任务消息编码为字节
  /// Encode task message to bytes
  pub(crate) fn encode_task_message(&self, msg: &TaskMessage) -> std::result::Result<Vec<u8>, BrokerError> {
    let mut buf = Vec::with_capacity(msg.encoded_len());
    msg.encode(&mut buf)?;
    Ok(buf)
  }

  /// 从字节解码任务消息
  /// Decode task message from bytes
  pub fn decode_task_message(&self, data: &[u8]) -> Result<TaskMessage> {
    TaskMessage::decode(data).map_err(Error::ProtoDecode)
  }

  /// 获取任务状态
  /// Get the state of a task
  pub async fn task_state(&self, queue: &str, id: &str) -> Option<TaskState> {
    let storage = self.storage.read().await;
    storage
      .tasks
      .get(&MemoryStorage::task_key(queue, id))
      .map(|data| data.state)
  }

  /// 获取存储的任务消息
  /// Get the stored task message
  pub async fn task_message(&self, queue: &str, id: &str) -> Result<Option<TaskMessage>> {
    let storage = self.storage.read().await;
    match storage.tasks.get(&MemoryStorage::task_key(queue, id)) {
      Some(data) => self.decode_task_message(&data.encoded).map(Some),
      None => Ok(None),
    }
  }

  /// 获取队列中等待处理的任务 ID，最早提交的在前
  /// Get pending task ids of a queue, oldest first
  pub async fn pending_ids(&self, queue: &str) -> Vec<String> {
    let storage = self.storage.read().await;
    storage
      .queue_data
      .get(queue)
      .map(|q| q.pending.clone())
      .unwrap_or_default()
  }

  /// 获取调度任务的处理时间
  /// Get the processing time of a scheduled task
  pub async fn scheduled_at(&self, queue: &str, id: &str) -> Option<DateTime<Utc>> {
    let storage = self.storage.read().await;
    let queue_data = storage.queue_data.get(queue)?;
    queue_data
      .scheduled
      .iter()
      .find(|(_, ids)| ids.iter().any(|x| x == id))
      .and_then(|(score, _)| DateTime::from_timestamp(*score, 0))
  }

  /// 获取所有已注册的队列
  /// Get all registered queues
  pub async fn queues(&self) -> Vec<String> {
    let storage = self.storage.read().await;
    let mut queues: Vec<String> = storage.queues.iter().cloned().collect();
    queues.sort();
    queues
  }

  /// 唯一键当前是否被占用
  /// Whether the unique key is currently held
  pub async fn is_unique_key_live(&self, unique_key: &str) -> bool {
    let storage = self.storage.read().await;
    storage.unique_key_live(unique_key, Instant::now())
  }

  /// 清理过期的唯一键
  /// Clean up expired unique keys
  pub async fn cleanup_expired_unique_keys(&self) -> usize {
    let now = Instant::now();
    let mut storage = self.storage.write().await;
    let before = storage.unique_keys.len();
    storage
      .unique_keys
      .retain(|_, (_, expires_at)| expires_at.is_none_or(|at| at > now));
    before - storage.unique_keys.len()
  }
}
