//! 经纪人模块
//! Broker module
//!
//! 定义了与 Redis 交互的抽象层
//! Defines the abstraction layer for interacting with Redis

mod broker;
pub mod redis_broker;
pub mod redis_scripts;

pub use redis_broker::RedisBroker;
