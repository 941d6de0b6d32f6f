//! Redis Lua 脚本模块
//!
//! 提供与 hibiken/asynq Go 版本兼容的提交脚本，确保操作的原子性
//! 需要保证与 Go 版本的脚本保持同步，以避免潜在的兼容性问题

use crate::base::BrokerError;
use phf::phf_map;
use redis::aio::MultiplexedConnection;
use redis::{ErrorKind, RedisError, RedisWrite, ToRedisArgs};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub enum RedisArg {
  Int(i64),
  Str(String),
  Bytes(Vec<u8>),
}

impl ToRedisArgs for RedisArg {
  fn write_redis_args<W>(&self, out: &mut W)
  where
    W: ?Sized + RedisWrite,
  {
    match self {
      RedisArg::Int(i) => i.write_redis_args(out),
      RedisArg::Str(s) => s.write_redis_args(out),
      RedisArg::Bytes(b) => b.write_redis_args(out),
    }
  }
}

/// Redis Lua 脚本集合 - 与 Go 版本兼容
pub mod scripts {
  /// 入队任务脚本 - 基于 Go 版本的 enqueueCmd
  /// `KEYS[1]` -> asynq:{`<qname>`}:t:<task_id>
  /// `KEYS[2]` -> asynq:{`<qname>`}:pending
  /// `ARGV[1]` -> task message data
  /// `ARGV[2]` -> task ID
  /// `ARGV[3]` -> current unix time in nsec
  /// Returns 1 if successfully enqueued, 0 if task ID already exists
  pub const ENQUEUE: &str = r#"
        if redis.call("EXISTS", KEYS[1]) == 1 then
            return 0
        end
        redis.call("HSET", KEYS[1],
                   "msg", ARGV[1],
                   "state", "pending",
                   "pending_since", ARGV[3])
        redis.call("LPUSH", KEYS[2], ARGV[2])
        return 1
    "#;

  /// 入队唯一任务脚本 - 基于 Go 版本的 enqueueUniqueCmd
  /// `KEYS[1]` -> unique key
  /// `KEYS[2]` -> asynq:{`<qname>`}:t:`<task_id>`
  /// `KEYS[3]` -> asynq:{`<qname>`}:pending
  /// `ARGV[1]` -> 任务ID / Task ID
  /// `ARGV[2]` -> 唯一锁TTL（秒）/ Uniqueness lock TTL in seconds
  /// `ARGV[3]` -> 任务消息数据 / Task message data
  /// `ARGV[4]` -> 当前时间（纳秒）/ Current unix time in nsec
  /// 返回值：1=成功，0=ID冲突，-1=唯一键已存在
  /// Returns: 1 if successfully enqueued, 0 if task ID conflicts, -1 if unique key exists
  pub const ENQUEUE_UNIQUE: &str = r#"
        local ok = redis.call("SET", KEYS[1], ARGV[1], "NX", "EX", ARGV[2])
        if not ok then
          return -1
        end
        if redis.call("EXISTS", KEYS[2]) == 1 then
          return 0
        end
        redis.call("HSET", KEYS[2],
                   "msg", ARGV[3],
                   "state", "pending",
                   "pending_since", ARGV[4],
                   "unique_key", KEYS[1])
        redis.call("LPUSH", KEYS[3], ARGV[1])
        return 1
    "#;

  /// 调度任务脚本 - 基于 Go 版本的 scheduleCmd
  /// `KEYS[1]` -> asynq:{`<qname>`}:t:<task_id>
  /// `KEYS[2]` -> asynq:{`<qname>`}:scheduled
  /// `ARGV[1]` -> 任务消息数据 / Task message data
  /// `ARGV[2]` -> 执行时间（Unix时间戳）/ process_at time in Unix time
  /// `ARGV[3]` -> 任务ID / Task ID
  /// 返回值：1=成功，0=ID已存在
  /// Returns: 1 if successfully scheduled, 0 if task ID already exists
  pub const SCHEDULE: &str = r#"
        if redis.call("EXISTS", KEYS[1]) == 1 then
            return 0
        end
        redis.call("HSET", KEYS[1],
                   "msg", ARGV[1],
                   "state", "scheduled")
        redis.call("ZADD", KEYS[2], ARGV[2], ARGV[3])
        return 1
    "#;

  /// 调度唯一任务脚本 - 基于 Go 版本的 scheduleUniqueCmd
  /// `KEYS[1]` -> unique key
  /// `KEYS[2]` -> asynq:{`<qname>`}:t:<task_id>
  /// `KEYS[3]` -> asynq:{`<qname>`}:scheduled
  /// `ARGV[1]` -> 任务ID / Task ID
  /// `ARGV[2]` -> 唯一锁TTL（秒）/ Uniqueness lock TTL in seconds
  /// `ARGV[3]` -> 执行时间（Unix时间戳）/ process_at time in Unix time
  /// `ARGV[4]` -> 任务消息数据 / Task message data
  /// 返回值：1=成功，0=ID冲突，-1=唯一键已存在
  /// Returns: 1 if successfully scheduled, 0 if task ID conflicts, -1 if unique key exists
  pub const SCHEDULE_UNIQUE: &str = r#"
        local ok = redis.call("SET", KEYS[1], ARGV[1], "NX", "EX", ARGV[2])
        if not ok then
          return -1
        end
        if redis.call("EXISTS", KEYS[2]) == 1 then
          return 0
        end
        redis.call("HSET", KEYS[2],
                   "msg", ARGV[4],
                   "state", "scheduled",
                   "unique_key", KEYS[1])
        redis.call("ZADD", KEYS[3], ARGV[3], ARGV[1])
        return 1
    "#;
}

static ALL_SCRIPT: phf::Map<&'static str, &'static str> = phf_map! {
    "enqueue" => scripts::ENQUEUE,
    "enqueue_unique" => scripts::ENQUEUE_UNIQUE,
    "schedule" => scripts::SCHEDULE,
    "schedule_unique" => scripts::SCHEDULE_UNIQUE,
};

/// 将脚本返回码转换为存储后端信号
/// Translate a script status code into a backing-store signal
pub fn script_reply(code: i64) -> Result<(), BrokerError> {
  match code {
    1 => Ok(()),
    0 => Err(BrokerError::TaskIdConflict),
    -1 => Err(BrokerError::DuplicateTask),
    other => Err(BrokerError::UnexpectedReply(other)),
  }
}

/// Redis 脚本管理器
#[derive(Debug, Default)]
pub struct ScriptManager {
  /// 脚本SHA缓存
  script_sha1: HashMap<&'static str, String>,
}

impl ScriptManager {
  /// 预加载所有脚本
  pub async fn load_scripts(&mut self, conn: &mut MultiplexedConnection) -> Result<(), BrokerError> {
    for (name, script) in ALL_SCRIPT.entries() {
      let sha = self.load_script(conn, script).await?;
      self.script_sha1.insert(*name, sha);
    }
    Ok(())
  }

  pub async fn load_script(
    &self,
    conn: &mut MultiplexedConnection,
    script: &str,
  ) -> Result<String, BrokerError> {
    let sha: String = redis::cmd("SCRIPT")
      .arg("LOAD")
      .arg(script)
      .query_async(conn)
      .await?;
    Ok(sha)
  }

  /// 获取脚本SHA
  pub fn get_script_sha(&self, name: &str) -> Option<&String> {
    self.script_sha1.get(name)
  }

  /// 执行脚本，脚本缓存被清空时（NOSCRIPT）回退到 EVAL
  pub async fn eval_script<T>(
    &self,
    conn: &mut MultiplexedConnection,
    script_name: &str,
    keys: &[String],
    args: &[RedisArg],
  ) -> Result<T, BrokerError>
  where
    T: redis::FromRedisValue,
  {
    let script = ALL_SCRIPT.get(script_name).ok_or_else(|| {
      RedisError::from((
        ErrorKind::ClientError,
        "script not registered",
        script_name.to_string(),
      ))
    })?;

    if let Some(sha) = self.get_script_sha(script_name) {
      match redis::cmd("EVALSHA")
        .arg(sha)
        .arg(keys.len())
        .arg(keys)
        .arg(args)
        .query_async::<T>(conn)
        .await
      {
        Ok(result) => return Ok(result),
        Err(e) if e.kind() == ErrorKind::NoScriptError => {
          tracing::debug!("script {} was flushed from redis, falling back to EVAL", script_name);
        }
        Err(e) => return Err(e.into()),
      }
    }

    let result = redis::cmd("EVAL")
      .arg(*script)
      .arg(keys.len())
      .arg(keys)
      .arg(args)
      .query_async::<T>(conn)
      .await?;
    Ok(result)
  }
}
