//! 内存经纪人模块
//! Memory broker module
//!
//! 定义了基于内存的任务存储，不依赖任何外部服务
//! Defines the in-memory task storage without any external service dependencies

mod broker;
pub mod memory_broker;

pub use memory_broker::MemoryBroker;
