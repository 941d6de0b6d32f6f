//! # Asynq Client
//!
//! Asynq 分布式任务队列的生产者端：将任务提交到 Redis 支持的队列中
//! The producer side of the Asynq distributed task queue: submits tasks to Redis-backed queues
//!
//! 写入的记录与 hibiken/asynq 的 Go 版本兼容，Go 或 Rust 的工作者都可以处理。
//! Records are written in the layout used by the Go hibiken/asynq, so Go or Rust workers
//! can process them.
//!
//! ## 特性
//! ## Features
//!
//! - 立即入队或延迟到指定时间
//!   - Enqueue right away or defer to a given time
//! - 使用唯一选项去重任务
//!   - Deduplication of tasks using unique option
//! - 支持每个任务的超时和截止时间
//!   - Supports timeout and deadline for each task
//! - 重试次数、队列、任务 ID 与保留期限选项
//!   - Retry, queue, task ID and retention options
//! - 内存存储后端，便于测试
//!   - In-memory store for tests
//!
//! ## 快速开始
//! ## Quick Start
//!
//! ```rust,no_run
//! use asynq_client::client::Client;
//! use asynq_client::option::TaskOption;
//! use asynq_client::redis::RedisConnectionConfig;
//! use asynq_client::task::Task;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 创建 Redis 配置
//!     // Create Redis configuration
//!     let redis_config = RedisConnectionConfig::from_url("redis://127.0.0.1:6379")?;
//!
//!     // 创建客户端
//!     // Create client
//!     let client = Client::new(redis_config).await?;
//!
//!     // 创建任务并加入队列
//!     // Create a task and enqueue it
//!     let task = Task::new("email:deliver", b"task payload");
//!     let info = client
//!         .enqueue(
//!             &task,
//!             vec![
//!                 TaskOption::queue("critical"),
//!                 TaskOption::process_in(Duration::from_secs(3600)),
//!                 TaskOption::unique(Duration::from_secs(600)),
//!             ],
//!         )
//!         .await?;
//!     println!("enqueued {} in {} ({})", info.id, info.queue, info.state);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod base;
pub mod client;
pub mod config;
pub mod error;
pub mod memdb;
pub mod message;
pub mod option;
pub mod proto;
pub mod rdb;
pub mod redis;
pub mod task;

pub use client::Client;
pub use error::{Error, Result};
pub use option::TaskOption;
pub use task::{Task, TaskInfo};
