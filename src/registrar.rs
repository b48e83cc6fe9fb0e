//! 服务注册器
//!
//! 解析器协议的生产者一侧：把服务实例记录写到 `{root}/{service}/{instance_id}`。
//! 记录没有租约，直到被覆盖或删除之前一直存在。

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{ResolverError, Result};
use crate::instance::{DEFAULT_KEY_ROOT, ServiceRecord, instance_key};
use crate::registry::RegistryClient;

/// 服务注册器
#[derive(Clone)]
pub struct Registrar {
    registry: Arc<dyn RegistryClient>,
    key_root: String,
}

impl Registrar {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            key_root: DEFAULT_KEY_ROOT.to_string(),
        }
    }

    /// 设置注册中心根路径（默认 `/services`）
    pub fn with_key_root(mut self, key_root: impl Into<String>) -> Self {
        self.key_root = key_root.into();
        self
    }

    /// 发布一个服务实例
    ///
    /// 单次写入；失败时注册中心保持不变，错误直接返回，不重试。
    pub async fn publish(
        &self,
        service_name: &str,
        instance_id: &str,
        addr: &str,
        weight: u32,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let record = ServiceRecord {
            addr: addr.to_string(),
            weight,
            metadata,
        };
        self.publish_record(service_name, instance_id, &record).await
    }

    /// 发布已构造好的记录
    pub async fn publish_record(
        &self,
        service_name: &str,
        instance_id: &str,
        record: &ServiceRecord,
    ) -> Result<()> {
        let key = self.key(service_name, instance_id)?;
        let value = record.encode()?;

        self.registry.put(&key, value).await?;

        info!(key = %key, addr = %record.addr, weight = record.weight, "Registered service");
        Ok(())
    }

    /// 删除一个服务实例的记录
    pub async fn withdraw(&self, service_name: &str, instance_id: &str) -> Result<()> {
        let key = self.key(service_name, instance_id)?;
        self.registry.delete(&key).await?;

        info!(key = %key, "Unregistered service");
        Ok(())
    }

    fn key(&self, service_name: &str, instance_id: &str) -> Result<String> {
        if service_name.is_empty() || service_name.contains('/') {
            return Err(ResolverError::InvalidTarget(service_name.to_string()));
        }
        if instance_id.is_empty() || instance_id.contains('/') {
            return Err(ResolverError::InvalidTarget(format!(
                "{}/{}",
                service_name, instance_id
            )));
        }
        Ok(instance_key(&self.key_root, service_name, instance_id))
    }
}
