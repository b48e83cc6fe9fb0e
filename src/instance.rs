//! 服务实例记录定义

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// 注册中心默认根路径
pub const DEFAULT_KEY_ROOT: &str = "/services";

/// 非 JSON 记录回退时使用的权重
pub const FALLBACK_WEIGHT: u32 = 1;

/// 服务实例记录
///
/// 注册中心中存储的值即为该结构的 JSON 形式：
/// `{"addr": "10.0.0.1:9000", "weight": 2, "metadata": {"zone": "a"}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceRecord {
    /// 服务地址（host:port）
    pub addr: String,

    /// 权重（由选择策略自行解释）
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: u32,

    /// 元数据（如 region、zone）
    #[serde(
        default,
        deserialize_with = "nullable_metadata",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub metadata: HashMap<String, String>,
}

/// `null` 视为 0，负数截断为 0，超出 u32 的值截断为 `u32::MAX`
fn lenient_weight<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let weight = Option::<i64>::deserialize(deserializer)?.unwrap_or(0);
    Ok(weight.clamp(0, u32::MAX as i64) as u32)
}

/// 生产者可能写入 `"metadata": null`
fn nullable_metadata<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServiceRecord {
    /// 创建新的服务记录
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            weight: FALLBACK_WEIGHT,
            metadata: HashMap::new(),
        }
    }

    /// 设置权重
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 从注册中心的原始值解码
    ///
    /// 无法解码为 JSON 记录的值被视为裸地址，权重为 1，没有元数据。
    pub fn decode(raw: &[u8]) -> Self {
        match serde_json::from_slice::<ServiceRecord>(raw) {
            Ok(record) => record,
            Err(_) => Self {
                addr: String::from_utf8_lossy(raw).into_owned(),
                weight: FALLBACK_WEIGHT,
                metadata: HashMap::new(),
            },
        }
    }

    /// 编码为注册中心的值
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// 转换为 gRPC URI
    pub fn to_grpc_uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// 检查元数据是否包含全部给定键值
    pub fn matches_metadata(&self, filters: &HashMap<String, String>) -> bool {
        filters
            .iter()
            .all(|(key, value)| self.metadata.get(key).map(|v| v == value).unwrap_or(false))
    }
}

/// 服务前缀：`{root}/{service}/`
///
/// 以 `/` 结尾，`orders` 不会匹配 `orders-v2` 下的实例。
pub fn service_prefix(root: &str, service_name: &str) -> String {
    format!("{}/{}/", root.trim_end_matches('/'), service_name)
}

/// 实例键：`{root}/{service}/{instance_id}`
pub fn instance_key(root: &str, service_name: &str, instance_id: &str) -> String {
    format!("{}{}", service_prefix(root, service_name), instance_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_record() {
        let record = ServiceRecord::decode(
            br#"{"addr":"10.0.0.1:9000","weight":2,"metadata":{"zone":"a"}}"#,
        );
        assert_eq!(record.addr, "10.0.0.1:9000");
        assert_eq!(record.weight, 2);
        assert_eq!(record.metadata.get("zone").map(String::as_str), Some("a"));
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let record = ServiceRecord::decode(br#"{"addr":"10.0.0.1:9000"}"#);
        assert_eq!(record.weight, 0);
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn null_metadata_and_weight_are_defaults() {
        let record = ServiceRecord::decode(
            br#"{"addr":"10.0.0.1:9000","weight":null,"metadata":null}"#,
        );
        assert_eq!(record.addr, "10.0.0.1:9000");
        assert_eq!(record.weight, 0);
        assert!(record.metadata.is_empty());

        let record =
            ServiceRecord::decode(br#"{"addr":"10.0.0.1:9000","weight":2,"metadata":null}"#);
        assert_eq!(record.addr, "10.0.0.1:9000");
        assert_eq!(record.weight, 2);
    }

    #[test]
    fn out_of_range_weight_is_clamped() {
        let record = ServiceRecord::decode(br#"{"addr":"10.0.0.1:9000","weight":-1}"#);
        assert_eq!(record.addr, "10.0.0.1:9000");
        assert_eq!(record.weight, 0);

        let record = ServiceRecord::decode(br#"{"addr":"10.0.0.1:9000","weight":8589934592}"#);
        assert_eq!(record.weight, u32::MAX);
    }

    #[test]
    fn raw_value_falls_back_to_bare_address() {
        let record = ServiceRecord::decode(b"10.0.0.3:9000");
        assert_eq!(record, ServiceRecord::new("10.0.0.3:9000"));
        assert_eq!(record.weight, FALLBACK_WEIGHT);
    }

    #[test]
    fn json_without_addr_falls_back_to_raw_text() {
        let raw = br#"{"weight":3}"#;
        let record = ServiceRecord::decode(raw);
        assert_eq!(record.addr, r#"{"weight":3}"#);
        assert_eq!(record.weight, FALLBACK_WEIGHT);
    }

    #[test]
    fn keys_are_deterministic() {
        assert_eq!(service_prefix("/services", "orders"), "/services/orders/");
        assert_eq!(service_prefix("/services/", "orders"), "/services/orders/");
        assert_eq!(
            instance_key(DEFAULT_KEY_ROOT, "orders", "i1"),
            "/services/orders/i1"
        );
    }

    #[test]
    fn empty_metadata_is_omitted_on_encode() {
        let encoded = ServiceRecord::new("a:1").with_weight(2).encode().unwrap();
        assert_eq!(encoded, br#"{"addr":"a:1","weight":2}"#.to_vec());
    }
}
