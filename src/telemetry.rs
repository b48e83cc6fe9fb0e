//! 日志初始化

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::TelemetryConfig;
use crate::error::{ResolverError, Result};

/// 安装全局 tracing subscriber
///
/// `RUST_LOG` 优先于配置中的日志级别。重复初始化返回配置错误。
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ResolverError::config(format!("invalid log level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| ResolverError::config(format!("tracing already initialized: {}", e)))
}
