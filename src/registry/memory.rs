//! 进程内注册中心
//!
//! 行为与 etcd 后端一致（前缀读取、前缀订阅、写入、删除），用于测试和本地开发。
//! 支持故障注入：整体不可用、向订阅者推送错误、强制结束订阅。

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::warn;

use super::{EventKind, KeyValue, RegistryClient, WatchBatch, WatchEvent, WatchStream};
use crate::error::{ResolverError, Result};

const DEFAULT_WATCH_BUFFER: usize = 64;

struct Subscriber {
    prefix: String,
    tx: mpsc::Sender<Result<WatchBatch>>,
}

/// 进程内注册中心
#[derive(Default)]
pub struct MemoryRegistry {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    subscribers: Mutex<Vec<Subscriber>>,
    unavailable: AtomicBool,
    get_delay_ms: AtomicU64,
    get_calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟注册中心不可达：所有请求返回错误
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 为每次前缀读取增加延迟
    pub fn set_get_delay(&self, delay: Duration) {
        self.get_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// 已执行的前缀读取次数
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// 当前仍存活的订阅数
    pub async fn watcher_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|s| !s.tx.is_closed());
        subscribers.len()
    }

    /// 向全部订阅者推送一个错误
    pub async fn inject_watch_error(&self, msg: &str) {
        let subscribers = self.subscribers.lock().await;
        for subscriber in subscribers.iter() {
            let _ = subscriber
                .tx
                .try_send(Err(ResolverError::watch(msg.to_string())));
        }
    }

    /// 结束全部订阅（模拟连接断开）
    pub async fn end_watches(&self) {
        self.subscribers.lock().await.clear();
    }

    /// 一次写入多个键，订阅者只收到一批通知
    pub async fn put_batch(&self, kvs: Vec<KeyValue>) -> Result<()> {
        self.ensure_available()?;
        let mut events = Vec::with_capacity(kvs.len());
        {
            let mut entries = self.entries.write().await;
            for kv in kvs {
                events.push(WatchEvent {
                    kind: EventKind::Put,
                    key: kv.key.clone(),
                });
                entries.insert(kv.key, kv.value);
            }
        }
        self.notify(events).await;
        Ok(())
    }

    /// 读取单个键
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().await.get(key).cloned()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ResolverError::registry("registry unavailable"));
        }
        Ok(())
    }

    async fn notify(&self, events: Vec<WatchEvent>) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|s| !s.tx.is_closed());

        for subscriber in subscribers.iter() {
            let matched: Vec<WatchEvent> = events
                .iter()
                .filter(|e| e.key.starts_with(&subscriber.prefix))
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }
            if let Err(e) = subscriber.tx.try_send(Ok(WatchBatch { events: matched })) {
                warn!(prefix = %subscriber.prefix, error = %e, "Dropping watch notification");
            }
        }
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.get_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.ensure_available()?;
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect())
    }

    async fn watch(&self, prefix: &str) -> Result<WatchStream> {
        self.ensure_available()?;
        let (tx, stream) = WatchStream::channel(DEFAULT_WATCH_BUFFER);
        self.subscribers.lock().await.push(Subscriber {
            prefix: prefix.to_string(),
            tx,
        });
        Ok(stream)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.ensure_available()?;
        self.entries.write().await.insert(key.to_string(), value);
        self.notify(vec![WatchEvent {
            kind: EventKind::Put,
            key: key.to_string(),
        }])
        .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_available()?;
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            self.notify(vec![WatchEvent {
                kind: EventKind::Delete,
                key: key.to_string(),
            }])
            .await;
        }
        Ok(())
    }
}
