//! Redis 配置和连接管理模块
//! Redis configuration and connection management module

use crate::error::{Error, Result};
use redis::{ConnectionInfo, IntoConnectionInfo};

/// 支持的连接描述符 scheme
/// Supported connection descriptor schemes
const SUPPORTED_SCHEMES: [&str; 3] = ["redis", "redis+unix", "unix"];

/// Redis 连接配置
/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConnectionConfig {
  /// Redis 连接信息
  /// Redis connection info
  pub connection_info: ConnectionInfo,
}

impl RedisConnectionConfig {
  /// 创建单机连接配置
  /// Create a standalone connection configuration
  pub fn single<T: IntoConnectionInfo>(connection_info: T) -> Result<Self> {
    Ok(Self {
      connection_info: connection_info.into_connection_info()?,
    })
  }

  /// 从 Redis URL 创建配置，不支持的 scheme 返回配置错误
  /// Create configuration from a Redis URL; unsupported schemes are a configuration error
  pub fn from_url(url: &str) -> Result<Self> {
    let scheme = url.split_once("://").map(|(scheme, _)| scheme);
    match scheme {
      Some(scheme) if SUPPORTED_SCHEMES.contains(&scheme) => Self::single(url),
      _ => Err(Error::config(format!(
        "unsupported connection descriptor: {url}"
      ))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_redis_config_creation() {
    let config = RedisConnectionConfig::from_url("redis://127.0.0.1:6379").unwrap();
    assert_eq!(config.connection_info.addr.to_string(), "127.0.0.1:6379");
  }

  #[test]
  fn test_unsupported_descriptor() {
    let err = RedisConnectionConfig::from_url("memcached://127.0.0.1:11211").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(RedisConnectionConfig::from_url("127.0.0.1:6379").is_err());
  }

  #[test]
  fn test_single_from_tuple() {
    let config = RedisConnectionConfig::single(("localhost", 6380)).unwrap();
    assert_eq!(config.connection_info.addr.to_string(), "localhost:6380");
  }
}
