//! 固定地址表解析器
//!
//! 地址来自构建时给定的 服务名 -> 地址列表 映射，不访问注册中心。
//! 适用于本地开发、直连部署以及不依赖注册中心的测试。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use super::{Address, ClientConn, Resolver, ResolverBuilder, State, Target};
use crate::error::{ResolverError, Result};

/// 固定地址表默认 scheme
pub const FIXED_SCHEME: &str = "flare-static";

/// 固定地址表解析器构建器
#[derive(Debug, Clone)]
pub struct FixedResolverBuilder {
    scheme: String,
    services: HashMap<String, Vec<String>>,
}

impl Default for FixedResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedResolverBuilder {
    pub fn new() -> Self {
        Self {
            scheme: FIXED_SCHEME.to_string(),
            services: HashMap::new(),
        }
    }

    /// 设置 scheme
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// 为服务设置地址列表（覆盖已有的）
    pub fn with_service<I, S>(mut self, service: impl Into<String>, addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services
            .insert(service.into(), addrs.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl ResolverBuilder for FixedResolverBuilder {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn build(&self, target: Target, conn: Arc<dyn ClientConn>) -> Result<Box<dyn Resolver>> {
        let service = target.endpoint();
        if service.is_empty() || service.contains('/') {
            return Err(ResolverError::InvalidTarget(target.to_string()));
        }

        let addresses = self
            .services
            .get(service)
            .map(|addrs| addrs.iter().map(Address::new).collect())
            .unwrap_or_default();

        let resolver = FixedResolver {
            target,
            addresses,
            conn,
            closed: AtomicBool::new(false),
        };
        resolver.resolve_now().await;
        Ok(Box::new(resolver))
    }
}

/// 固定地址表解析器
pub struct FixedResolver {
    target: Target,
    addresses: Vec<Address>,
    conn: Arc<dyn ClientConn>,
    closed: AtomicBool,
}

#[async_trait]
impl Resolver for FixedResolver {
    async fn resolve_now(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if self.addresses.is_empty() {
            debug!(target_uri = %self.target, "No static addresses for service");
            return;
        }
        if let Err(e) = self.conn.update_state(State::new(self.addresses.clone())).await {
            warn!(target_uri = %self.target, error = %e, "Failed to push static addresses");
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
