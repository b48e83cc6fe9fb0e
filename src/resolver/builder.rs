//! etcd 解析器构建器

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::watcher::{EtcdResolver, ResolverInner};
use super::{ClientConn, DEFAULT_SCHEME, Resolver, ResolverBuilder, Target};
use crate::config::Config;
use crate::error::{ResolverError, Result};
use crate::instance::{DEFAULT_KEY_ROOT, service_prefix};
use crate::policy::{SelectAll, SelectionPolicy};
use crate::registry::{EtcdRegistry, RegistryClient};

/// etcd 解析器构建器
///
/// 持有一个已建立的注册中心连接，由它构建出的所有解析器共享该连接。
/// 构建器本身无状态，可以并发地为不同目标构建解析器。
///
/// # 示例
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use flare_resolver::{Config, EtcdResolverBuilder, Resolver, SchemeRegistry};
///
/// # async fn run(conn: Arc<dyn flare_resolver::ClientConn>) -> flare_resolver::Result<()> {
/// let config = Config::default();
/// let builder = EtcdResolverBuilder::connect(&config).await?;
///
/// let mut schemes = SchemeRegistry::new();
/// schemes.register(Arc::new(builder))?;
///
/// let resolver = schemes.dial("flare-etcd:///hello-service", conn).await?;
/// resolver.resolve_now().await;
/// resolver.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EtcdResolverBuilder {
    scheme: String,
    key_root: String,
    registry: Arc<dyn RegistryClient>,
    policy: Arc<dyn SelectionPolicy>,
    resubscribe_base: Duration,
    resubscribe_max: Duration,
}

impl EtcdResolverBuilder {
    /// 使用已建立的注册中心客户端创建构建器
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            key_root: DEFAULT_KEY_ROOT.to_string(),
            registry,
            policy: Arc::new(SelectAll),
            resubscribe_base: Duration::from_millis(500),
            resubscribe_max: Duration::from_secs(30),
        }
    }

    /// 按配置连接 etcd 并创建构建器
    ///
    /// 连接失败直接返回错误，不做延迟重试。
    pub async fn connect(config: &Config) -> Result<Self> {
        let registry = EtcdRegistry::connect(&config.registry).await?;
        Ok(Self::new(Arc::new(registry))
            .with_scheme(config.resolver.scheme.clone())
            .with_key_root(config.registry.key_root.clone())
            .with_resubscribe_backoff(
                config.resolver.resubscribe_base(),
                config.resolver.resubscribe_max(),
            ))
    }

    /// 设置 scheme
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// 设置注册中心根路径（默认 `/services`）
    pub fn with_key_root(mut self, key_root: impl Into<String>) -> Self {
        self.key_root = key_root.into();
        self
    }

    /// 替换地址选择策略
    pub fn with_policy(mut self, policy: impl SelectionPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// 设置通知流结束后重新订阅的退避参数
    pub fn with_resubscribe_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.resubscribe_base = base;
        self.resubscribe_max = max;
        self
    }

    /// 共享的注册中心客户端
    pub fn registry(&self) -> Arc<dyn RegistryClient> {
        self.registry.clone()
    }

    /// 为目标构建解析器
    ///
    /// 先订阅前缀，再同步刷新一次，最后启动后台 watch 任务。
    /// 订阅或首次读取失败都作为构建错误返回。
    pub async fn build_resolver(
        &self,
        target: Target,
        conn: Arc<dyn ClientConn>,
    ) -> Result<EtcdResolver> {
        let service = target.endpoint();
        if service.is_empty() || service.contains('/') {
            return Err(ResolverError::InvalidTarget(target.to_string()));
        }

        let prefix = service_prefix(&self.key_root, service);
        let stream = self.registry.watch(&prefix).await?;

        let inner = ResolverInner::new(
            target.clone(),
            prefix.clone(),
            self.registry.clone(),
            self.policy.clone(),
            conn,
            self.resubscribe_base,
            self.resubscribe_max,
        );
        let resolver = EtcdResolver::start(inner, stream).await?;

        info!(target_uri = %target, prefix = %prefix, "Resolver started");
        Ok(resolver)
    }
}

#[async_trait]
impl ResolverBuilder for EtcdResolverBuilder {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn build(&self, target: Target, conn: Arc<dyn ClientConn>) -> Result<Box<dyn Resolver>> {
        let resolver = self.build_resolver(target, conn).await?;
        Ok(Box::new(resolver))
    }
}
