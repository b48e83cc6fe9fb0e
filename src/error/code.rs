//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 注册中心连接相关错误
/// - 2000-2999: 目标 / scheme 相关错误
/// - 3000-3999: 注册中心读写与订阅错误
/// - 6000-6999: 系统与配置错误
/// - 8000-8999: 序列化相关错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 连接相关错误 (1000-1999)
    // ============================================================
    ConnectionFailed = 1000,

    // ============================================================
    // 目标相关错误 (2000-2999)
    // ============================================================
    InvalidTarget = 2000,
    SchemeConflict = 2001,
    UnknownScheme = 2002,

    // ============================================================
    // 注册中心错误 (3000-3999)
    // ============================================================
    RegistryRequestFailed = 3000,
    WatchFailed = 3001,
    ConsumerRejected = 3002,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    ConfigurationError = 6000,

    // ============================================================
    // 序列化相关错误 (8000-8999)
    // ============================================================
    SerializationError = 8000,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::ConnectionFailed),
            2000 => Some(ErrorCode::InvalidTarget),
            2001 => Some(ErrorCode::SchemeConflict),
            2002 => Some(ErrorCode::UnknownScheme),
            3000 => Some(ErrorCode::RegistryRequestFailed),
            3001 => Some(ErrorCode::WatchFailed),
            3002 => Some(ErrorCode::ConsumerRejected),
            6000 => Some(ErrorCode::ConfigurationError),
            8000 => Some(ErrorCode::SerializationError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::InvalidTarget => "INVALID_TARGET",
            ErrorCode::SchemeConflict => "SCHEME_CONFLICT",
            ErrorCode::UnknownScheme => "UNKNOWN_SCHEME",
            ErrorCode::RegistryRequestFailed => "REGISTRY_REQUEST_FAILED",
            ErrorCode::WatchFailed => "WATCH_FAILED",
            ErrorCode::ConsumerRejected => "CONSUMER_REJECTED",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
        }
    }

    /// 获取错误代码的类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Connection,
            2000..=2999 => ErrorCategory::Target,
            3000..=3999 => ErrorCategory::Registry,
            8000..=8999 => ErrorCategory::Serialization,
            _ => ErrorCategory::System,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RegistryRequestFailed | ErrorCode::WatchFailed
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Connection,
    Target,
    Registry,
    System,
    Serialization,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Connection => write!(f, "CONNECTION"),
            ErrorCategory::Target => write!(f, "TARGET"),
            ErrorCategory::Registry => write!(f, "REGISTRY"),
            ErrorCategory::System => write!(f, "SYSTEM"),
            ErrorCategory::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}
