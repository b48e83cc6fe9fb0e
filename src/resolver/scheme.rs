//! scheme -> 构建器 注册表
//!
//! 不使用进程级全局变量：在初始化阶段创建并注册，之后以 `Arc` 共享只读使用。
//! 测试可以各自构造独立的注册表。

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::info;

use super::{ClientConn, Resolver, ResolverBuilder, Target};
use crate::error::{ResolverError, Result};

#[derive(Default, Clone)]
pub struct SchemeRegistry {
    builders: HashMap<String, Arc<dyn ResolverBuilder>>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册构建器
    ///
    /// 同一 scheme 只能注册一次，重复注册返回 `SchemeConflict`。
    pub fn register(&mut self, builder: Arc<dyn ResolverBuilder>) -> Result<()> {
        let scheme = builder.scheme().to_string();
        if scheme.is_empty() {
            return Err(ResolverError::config("resolver scheme must not be empty"));
        }

        match self.builders.entry(scheme) {
            Entry::Occupied(entry) => Err(ResolverError::SchemeConflict(entry.key().clone())),
            Entry::Vacant(entry) => {
                info!(scheme = %entry.key(), "Resolver builder registered");
                entry.insert(builder);
                Ok(())
            }
        }
    }

    /// 查找 scheme 对应的构建器
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn ResolverBuilder>> {
        self.builders.get(scheme).cloned()
    }

    /// 已注册的全部 scheme
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.builders.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// 解析目标字符串并用对应构建器创建解析器
    pub async fn dial(&self, target: &str, conn: Arc<dyn ClientConn>) -> Result<Box<dyn Resolver>> {
        let target = Target::parse(target)?;
        let builder = self
            .get(target.scheme())
            .ok_or_else(|| ResolverError::UnknownScheme(target.scheme().to_string()))?;
        builder.build(target, conn).await
    }
}
