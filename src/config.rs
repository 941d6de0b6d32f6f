//! 配置模块
//! Configuration module
//!
//! 定义了客户端的配置选项
//! Defines configuration options for the client

use crate::error::{Error, Result};
use std::time::Duration;

/// 客户端配置
/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  /// 连接超时时间
  /// Connection timeout
  pub connection_timeout: Duration,
  /// 单次请求的响应超时时间，提交调用本身不再额外设置时限
  /// Response timeout of a single store request; submission adds no deadline of its own
  pub response_timeout: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      connection_timeout: Duration::from_secs(30),
      response_timeout: Duration::from_secs(60),
    }
  }
}

impl ClientConfig {
  /// 创建新的客户端配置
  /// Create a new client configuration
  pub fn new() -> Self {
    Self::default()
  }

  /// 设置连接超时时间
  /// Set the connection timeout
  pub fn connection_timeout(mut self, timeout: Duration) -> Self {
    self.connection_timeout = timeout;
    self
  }

  /// 设置响应超时时间
  /// Set the response timeout
  pub fn response_timeout(mut self, timeout: Duration) -> Self {
    self.response_timeout = timeout;
    self
  }

  /// 验证配置
  /// Validate the configuration
  pub fn validate(&self) -> Result<()> {
    if self.connection_timeout.is_zero() {
      return Err(Error::config("Connection timeout must be greater than 0"));
    }
    if self.response_timeout.is_zero() {
      return Err(Error::config("Response timeout must be greater than 0"));
    }
    Ok(())
  }
}
