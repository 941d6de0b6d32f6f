use std::time::Duration;

/// 默认队列名称
pub const DEFAULT_QUEUE_NAME: &str = "default";

/// 默认最大重试次数
pub const DEFAULT_MAX_RETRY: i32 = 25;

/// 超时与截止时间都未设置时使用的默认超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60); // 30 分钟
