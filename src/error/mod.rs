//! 错误处理模块
//!
//! 解析器、注册器与注册中心客户端共用的错误类型

pub mod code;

pub use code::{ErrorCategory, ErrorCode};

use thiserror::Error;

/// 解析器统一错误类型
#[derive(Error, Debug)]
pub enum ResolverError {
    /// 无法连接注册中心（构建期致命错误）
    #[error("无法连接注册中心 {endpoints:?}: {reason}")]
    Connection {
        endpoints: Vec<String>,
        reason: String,
    },

    /// 目标格式错误或服务名为空
    #[error("非法目标 `{0}`")]
    InvalidTarget(String),

    /// 同一 scheme 重复注册
    #[error("scheme `{0}` 已注册构建器")]
    SchemeConflict(String),

    /// 未注册的 scheme
    #[error("scheme `{0}` 没有已注册的构建器")]
    UnknownScheme(String),

    /// 注册中心请求失败（get / put / delete）
    #[error("注册中心请求失败: {0}")]
    Registry(String),

    /// 变更通知流错误
    #[error("watch 错误: {0}")]
    Watch(String),

    /// 消费者拒绝地址更新
    #[error("地址更新被拒绝: {0}")]
    Consumer(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResolverError {
    /// 创建注册中心错误
    pub fn registry(msg: impl Into<String>) -> Self {
        ResolverError::Registry(msg.into())
    }

    /// 创建 watch 错误
    pub fn watch(msg: impl Into<String>) -> Self {
        ResolverError::Watch(msg.into())
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        ResolverError::Config(msg.into())
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            ResolverError::Connection { .. } => ErrorCode::ConnectionFailed,
            ResolverError::InvalidTarget(_) => ErrorCode::InvalidTarget,
            ResolverError::SchemeConflict(_) => ErrorCode::SchemeConflict,
            ResolverError::UnknownScheme(_) => ErrorCode::UnknownScheme,
            ResolverError::Registry(_) => ErrorCode::RegistryRequestFailed,
            ResolverError::Watch(_) => ErrorCode::WatchFailed,
            ResolverError::Consumer(_) => ErrorCode::ConsumerRejected,
            ResolverError::Config(_) => ErrorCode::ConfigurationError,
            ResolverError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<etcd_client::Error> for ResolverError {
    fn from(err: etcd_client::Error) -> Self {
        match err {
            etcd_client::Error::WatchError(msg) => ResolverError::Watch(msg),
            other => ResolverError::Registry(other.to_string()),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn all_errors() -> Vec<(ResolverError, ErrorCode, ErrorCategory)> {
        let serde_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        vec![
            (
                ResolverError::Connection {
                    endpoints: vec!["http://127.0.0.1:2379".into()],
                    reason: "refused".into(),
                },
                ErrorCode::ConnectionFailed,
                ErrorCategory::Connection,
            ),
            (
                ResolverError::InvalidTarget("orders".into()),
                ErrorCode::InvalidTarget,
                ErrorCategory::Target,
            ),
            (
                ResolverError::SchemeConflict("flare-etcd".into()),
                ErrorCode::SchemeConflict,
                ErrorCategory::Target,
            ),
            (
                ResolverError::UnknownScheme("dns".into()),
                ErrorCode::UnknownScheme,
                ErrorCategory::Target,
            ),
            (
                ResolverError::registry("unavailable"),
                ErrorCode::RegistryRequestFailed,
                ErrorCategory::Registry,
            ),
            (
                ResolverError::watch("stream reset"),
                ErrorCode::WatchFailed,
                ErrorCategory::Registry,
            ),
            (
                ResolverError::Consumer("closed".into()),
                ErrorCode::ConsumerRejected,
                ErrorCategory::Registry,
            ),
            (
                ResolverError::config("bad level"),
                ErrorCode::ConfigurationError,
                ErrorCategory::System,
            ),
            (
                ResolverError::from(serde_err),
                ErrorCode::SerializationError,
                ErrorCategory::Serialization,
            ),
        ]
    }

    #[test]
    fn every_error_maps_to_a_stable_code() {
        for (err, code, category) in all_errors() {
            assert_eq!(err.code(), code, "{}", err);
            assert_eq!(err.category(), category, "{}", err);
            assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
            assert!(!code.as_str().is_empty());
        }
        assert_eq!(ErrorCode::from_u32(4242), None);
    }

    #[test]
    fn only_registry_io_is_retryable() {
        for (err, code, _) in all_errors() {
            let expected = matches!(
                code,
                ErrorCode::RegistryRequestFailed | ErrorCode::WatchFailed
            );
            assert_eq!(err.is_retryable(), expected, "{}", err);
        }
    }

    #[test]
    fn etcd_watch_error_maps_to_watch() {
        let err = ResolverError::from(etcd_client::Error::WatchError("canceled".into()));
        assert!(matches!(err, ResolverError::Watch(_)));
        assert_eq!(err.code(), ErrorCode::WatchFailed);
    }
}
