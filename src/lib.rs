//! Flare Resolver
//!
//! 基于 etcd 的动态名称解析：gRPC 客户端按 `{scheme}:///{service}` 拨号，解析器订阅
//! `/services/{service}/` 前缀的变更，维护本地地址缓存，并把最新地址列表推送给
//! 连接管理 / 负载均衡层，无需重启客户端或重建连接。
//!
//! 注册器 [`Registrar`] 是同一协议的生产者一侧，负责写入服务实例记录。

pub mod balance;
pub mod cache;
pub mod config;
pub mod error;
pub mod instance;
pub mod policy;
pub mod registrar;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod telemetry;

// Re-exports
pub use balance::BalanceChannelConn;
pub use cache::{AddressCache, Snapshot};
pub use config::{Config, InstanceConfig, RegistryConfig, ResolverConfig, TelemetryConfig};
pub use error::{ErrorCategory, ErrorCode, ResolverError, Result};
pub use instance::{ServiceRecord, instance_key, service_prefix};
pub use policy::{MetadataFilter, SelectAll, SelectionPolicy};
pub use registrar::Registrar;
pub use registry::{EtcdRegistry, MemoryRegistry, RegistryClient, WatchBatch, WatchStream};
pub use resolver::{
    Address, ClientConn, DEFAULT_SCHEME, EtcdResolver, EtcdResolverBuilder, FIXED_SCHEME,
    FixedResolver, FixedResolverBuilder, RefreshOutcome, Resolver, ResolverBuilder, ResolverState,
    SchemeRegistry, State, Target,
};
pub use telemetry::init_tracing;
