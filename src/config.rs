//! 解析器配置
//!
//! TOML 文件加载，`ETCD_ENDPOINTS` 环境变量覆盖注册中心地址。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ResolverError, Result};
use crate::instance::DEFAULT_KEY_ROOT;
use crate::resolver::DEFAULT_SCHEME;

/// 顶层配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// 注册中心连接配置
    #[serde(default)]
    pub registry: RegistryConfig,

    /// 解析器配置
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// 日志配置
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// 启动时发布的服务实例
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// 注册中心（etcd）连接配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// etcd 地址列表
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// 单次请求超时（毫秒）
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// 服务记录的根路径
    #[serde(default = "default_key_root")]
    pub key_root: String,

    /// 每个订阅的通知缓冲区大小
    #[serde(default = "default_watch_buffer")]
    pub watch_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            key_root: default_key_root(),
            watch_buffer: default_watch_buffer(),
        }
    }
}

/// 解析器配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// 注册到 scheme 注册表的 scheme
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// 通知流结束后重新订阅的初始等待（毫秒）
    #[serde(default = "default_resubscribe_base_ms")]
    pub resubscribe_base_ms: u64,

    /// 重新订阅等待上限（毫秒）
    #[serde(default = "default_resubscribe_max_ms")]
    pub resubscribe_max_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            resubscribe_base_ms: default_resubscribe_base_ms(),
            resubscribe_max_ms: default_resubscribe_max_ms(),
        }
    }
}

impl ResolverConfig {
    /// 重新订阅初始等待
    pub fn resubscribe_base(&self) -> Duration {
        Duration::from_millis(self.resubscribe_base_ms)
    }

    pub fn resubscribe_max(&self) -> Duration {
        Duration::from_millis(self.resubscribe_max_ms)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// 日志级别或 EnvFilter 表达式，`RUST_LOG` 优先
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// 启动时要发布的服务实例
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// 服务名
    pub service: String,

    /// 实例 ID，为空时生成随机 ID
    pub id: Option<String>,

    /// 服务地址（host:port）
    pub addr: String,

    /// 权重
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// 元数据
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:2379".to_string()]
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_key_root() -> String {
    DEFAULT_KEY_ROOT.to_string()
}

fn default_watch_buffer() -> usize {
    64
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_resubscribe_base_ms() -> u64 {
    500
}

fn default_resubscribe_max_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_weight() -> u32 {
    1
}

impl Config {
    /// 从 TOML 文件加载，并应用环境变量覆盖
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolverError::config(format!("failed to read {}: {}", path, e)))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// 解析 TOML 文本
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ResolverError::config(e.to_string()))
    }

    /// 环境变量覆盖：`ETCD_ENDPOINTS` 为逗号分隔的地址列表
    pub fn apply_env(&mut self) {
        if let Ok(endpoints) = std::env::var("ETCD_ENDPOINTS") {
            let endpoints: Vec<String> = endpoints
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !endpoints.is_empty() {
                self.registry.endpoints = endpoints;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.registry.key_root, "/services");
        assert_eq!(config.resolver.scheme, DEFAULT_SCHEME);
        assert!(config.instances.is_empty());
    }

    #[test]
    fn parses_instances() {
        let config = Config::from_toml(
            r#"
            [registry]
            endpoints = ["http://10.0.0.9:2379"]

            [[instances]]
            service = "hello-service"
            id = "instance1"
            addr = "localhost:8080"
            weight = 3
            metadata = { region = "us-west", zone = "a" }
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.endpoints, vec!["http://10.0.0.9:2379"]);
        let instance = &config.instances[0];
        assert_eq!(instance.weight, 3);
        assert_eq!(instance.metadata.get("zone").map(String::as_str), Some("a"));
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml("registry = 3").unwrap_err();
        assert!(matches!(err, ResolverError::Config(_)));
    }

    #[test]
    fn parses_every_documented_field() {
        let config = Config::from_toml(
            r#"
            [registry]
            endpoints = ["http://10.0.0.9:2379", "http://10.0.0.10:2379"]
            connect_timeout_ms = 1000
            request_timeout_ms = 2000
            key_root = "/flare/services"
            watch_buffer = 8

            [resolver]
            scheme = "flare-etcd-b"
            resubscribe_base_ms = 100
            resubscribe_max_ms = 1000

            [telemetry]
            level = "debug"
            json = true

            [[instances]]
            service = "orders"
            addr = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.endpoints.len(), 2);
        assert_eq!(config.registry.connect_timeout_ms, 1000);
        assert_eq!(config.registry.request_timeout_ms, 2000);
        assert_eq!(config.registry.key_root, "/flare/services");
        assert_eq!(config.registry.watch_buffer, 8);
        assert_eq!(config.resolver.scheme, "flare-etcd-b");
        assert_eq!(config.resolver.resubscribe_base(), Duration::from_millis(100));
        assert_eq!(config.resolver.resubscribe_max(), Duration::from_secs(1));
        assert_eq!(config.telemetry.level, "debug");
        assert!(config.telemetry.json);

        let instance = &config.instances[0];
        assert_eq!(instance.id, None);
        assert_eq!(instance.weight, 1);
        assert!(instance.metadata.is_empty());
    }
}
