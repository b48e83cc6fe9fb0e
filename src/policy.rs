//! 地址选择策略
//!
//! 把缓存快照转换为推送给消费者的地址列表。策略必须是快照的纯函数：
//! 不产生副作用，也不保存快照之外的状态。

use std::collections::HashMap;

use crate::cache::Snapshot;
use crate::resolver::Address;

/// 地址选择策略 trait
pub trait SelectionPolicy: Send + Sync {
    /// 从快照中选出要下发的地址
    fn select(&self, snapshot: &Snapshot) -> Vec<Address>;
}

/// 任意 `Fn(&Snapshot) -> Vec<Address>` 都可以作为策略使用
impl<F> SelectionPolicy for F
where
    F: Fn(&Snapshot) -> Vec<Address> + Send + Sync,
{
    fn select(&self, snapshot: &Snapshot) -> Vec<Address> {
        self(snapshot)
    }
}

/// 默认策略：返回全部已知地址
///
/// 按注册中心键的顺序输出，忽略权重和元数据。
/// 加权选择留给使用方自行实现。
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectAll;

impl SelectionPolicy for SelectAll {
    fn select(&self, snapshot: &Snapshot) -> Vec<Address> {
        snapshot
            .values()
            .map(|record| Address::new(record.addr.clone()))
            .collect()
    }
}

/// 元数据过滤策略
///
/// 只保留元数据包含全部给定键值的记录，例如按 zone 就近选择。
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    filters: HashMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加过滤条件
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

impl SelectionPolicy for MetadataFilter {
    fn select(&self, snapshot: &Snapshot) -> Vec<Address> {
        snapshot
            .values()
            .filter(|record| record.matches_metadata(&self.filters))
            .map(|record| Address::new(record.addr.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::ServiceRecord;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "/services/orders/i2".into(),
            ServiceRecord::new("10.0.0.2:9000").with_metadata("zone", "b"),
        );
        snapshot.insert(
            "/services/orders/i1".into(),
            ServiceRecord::new("10.0.0.1:9000")
                .with_weight(5)
                .with_metadata("zone", "a"),
        );
        snapshot
    }

    #[test]
    fn select_all_ignores_weight_and_metadata() {
        let addrs = SelectAll.select(&snapshot());
        assert_eq!(
            addrs,
            vec![Address::new("10.0.0.1:9000"), Address::new("10.0.0.2:9000")]
        );
    }

    #[test]
    fn metadata_filter_keeps_matching_records() {
        let policy = MetadataFilter::new().with("zone", "b");
        assert_eq!(policy.select(&snapshot()), vec![Address::new("10.0.0.2:9000")]);
    }

    #[test]
    fn closures_are_policies() {
        let first_only = |snapshot: &Snapshot| -> Vec<Address> {
            snapshot
                .values()
                .take(1)
                .map(|r| Address::new(r.addr.clone()))
                .collect()
        };
        assert_eq!(first_only.select(&snapshot()).len(), 1);
    }
}
