//! 日志初始化
//!
//! 各层通过 `tracing` 输出日志。这里安装一个 `fmt` 订阅者，过滤规则优先取 `RUST_LOG`，
//! 没有设置时使用 [`DEFAULT_FILTER`]。依赖 `log` 宏的第三方库通过 `tracing-log` 转发。

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// 默认过滤规则
pub const DEFAULT_FILTER: &str = "fci_client=info,fci_driver=info,fci_transport=warn,fci_sdk=info";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Global subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("log bridge already set: {0}")]
    LogBridge(#[from] tracing_log::log::SetLoggerError),
}

/// 安装全局日志订阅者
///
/// 只能成功一次；之后的调用返回 [`LoggingError::Subscriber`]。
pub fn try_init_logging() -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_FILTER)?,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

/// 安装全局日志订阅者，已安装时静默忽略
pub fn init_logging() {
    if let Err(e) = try_init_logging() {
        tracing::debug!("Logging not initialized: {}", e);
    }
}
