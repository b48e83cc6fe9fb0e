//! 名称解析
//!
//! 与 gRPC 客户端的解析框架对接：`ResolverBuilder` 按 scheme 注册，拨号时为目标
//! `{scheme}:///{service}` 创建 `Resolver`；解析器通过 `ClientConn` 持续推送地址列表。

pub mod builder;
pub mod fixed;
pub mod scheme;
pub mod watcher;

pub use builder::EtcdResolverBuilder;
pub use fixed::{FIXED_SCHEME, FixedResolver, FixedResolverBuilder};
pub use scheme::SchemeRegistry;
pub use watcher::EtcdResolver;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ResolverError, Result};

/// 默认 scheme
pub const DEFAULT_SCHEME: &str = "flare-etcd";

/// 解析目标
///
/// 语法为 `{scheme}://{authority}/{endpoint}`，通常 authority 为空：`flare-etcd:///orders`。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    scheme: String,
    authority: String,
    endpoint: String,
}

impl Target {
    /// 构造不带 authority 的目标
    pub fn new(scheme: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            authority: String::new(),
            endpoint: endpoint.into(),
        }
    }

    /// 解析目标字符串
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| ResolverError::InvalidTarget(uri.to_string()))?;
        if scheme.is_empty() {
            return Err(ResolverError::InvalidTarget(uri.to_string()));
        }
        let (authority, endpoint) = rest.split_once('/').unwrap_or((rest, ""));

        Ok(Self {
            scheme: scheme.to_string(),
            authority: authority.to_string(),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// 服务名
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl FromStr for Target {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.authority, self.endpoint)
    }
}

/// 解析出的后端地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub addr: String,
}

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.addr)
    }
}

/// 推送给消费者的解析状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub addresses: Vec<Address>,
}

impl State {
    pub fn new(addresses: Vec<Address>) -> Self {
        Self { addresses }
    }
}

/// 地址更新的消费者（连接管理 / 负载均衡层）
///
/// 每次调用都以新的地址列表整体替换消费者的路由表。
#[async_trait]
pub trait ClientConn: Send + Sync {
    async fn update_state(&self, state: State) -> Result<()>;
}

/// 解析器
#[async_trait]
pub trait Resolver: Send + Sync {
    /// 立即刷新并推送一次；关闭后调用是安全的空操作
    async fn resolve_now(&self);

    /// 停止后台 watch 任务并释放订阅，可重复调用
    fn close(&self);
}

/// 解析器构建器，每个 scheme 注册一个
#[async_trait]
pub trait ResolverBuilder: Send + Sync {
    fn scheme(&self) -> &str;

    async fn build(&self, target: Target, conn: Arc<dyn ClientConn>) -> Result<Box<dyn Resolver>>;
}

/// 解析器生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Created,
    Watching,
    Closed,
}

/// 一次刷新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 已向消费者推送 n 个地址
    Pushed(usize),
    /// 快照为空，保留消费者的上一次状态
    Suppressed,
    /// 解析器已关闭，未执行
    Closed,
}
