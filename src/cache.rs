//! 地址缓存
//!
//! 只支持整体替换：刷新时在旁边构建完整的新映射，再一次性换入。
//! 读者拿到的要么是旧快照，要么是新快照，不会看到半更新的状态。

use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::instance::ServiceRecord;

/// 缓存快照：注册中心键 -> 服务记录
pub type Snapshot = BTreeMap<String, ServiceRecord>;

/// 地址缓存
#[derive(Debug, Default)]
pub struct AddressCache {
    current: ArcSwap<Snapshot>,
}

impl AddressCache {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 用新快照整体替换当前内容
    pub fn replace(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// 获取当前快照（只读视图，持有期间不受后续替换影响）
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// 获取当前内容的副本，供需要长期持有数据的调用方使用
    pub fn to_map(&self) -> Snapshot {
        self.current.load().as_ref().clone()
    }

    /// 查询单个记录
    pub fn get(&self, key: &str) -> Option<ServiceRecord> {
        self.current.load().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_snapshot_survives_replacement() {
        let cache = AddressCache::new();
        let mut first = Snapshot::new();
        first.insert("/services/a/1".into(), ServiceRecord::new("10.0.0.1:1"));
        cache.replace(first);

        let held = cache.snapshot();
        cache.replace(Snapshot::new());

        assert_eq!(held.len(), 1);
        assert!(cache.is_empty());
        assert!(cache.get("/services/a/1").is_none());
    }
}
