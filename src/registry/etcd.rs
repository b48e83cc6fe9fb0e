//! etcd 注册中心客户端

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, EventType, GetOptions, WatchOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{EventKind, KeyValue, RegistryClient, WatchBatch, WatchEvent, WatchStream};
use crate::config::RegistryConfig;
use crate::error::{ResolverError, Result};

/// etcd 注册中心客户端
///
/// 内部的 `Client` 可廉价克隆，每次请求各自克隆一份使用。
#[derive(Clone)]
pub struct EtcdRegistry {
    client: Client,
    watch_buffer: usize,
}

impl EtcdRegistry {
    /// 连接 etcd
    ///
    /// 连接失败属于构建期致命错误，直接返回给调用方。
    pub async fn connect(config: &RegistryConfig) -> Result<Self> {
        if config.endpoints.is_empty() {
            return Err(ResolverError::config("etcd endpoints not configured"));
        }

        let options = ConnectOptions::new()
            .with_connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .with_timeout(Duration::from_millis(config.request_timeout_ms));

        let client = Client::connect(&config.endpoints, Some(options))
            .await
            .map_err(|e| ResolverError::Connection {
                endpoints: config.endpoints.clone(),
                reason: e.to_string(),
            })?;

        info!(endpoints = ?config.endpoints, "Connected to etcd");

        Ok(Self {
            client,
            watch_buffer: config.watch_buffer,
        })
    }

    /// 使用已建立的客户端
    pub fn from_client(client: Client, watch_buffer: usize) -> Self {
        Self {
            client,
            watch_buffer,
        }
    }
}

#[async_trait]
impl RegistryClient for EtcdRegistry {
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let mut client = self.client.clone();
        let resp = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await?;

        Ok(resp
            .kvs()
            .iter()
            .map(|kv| {
                KeyValue::new(
                    String::from_utf8_lossy(kv.key()).into_owned(),
                    kv.value().to_vec(),
                )
            })
            .collect())
    }

    async fn watch(&self, prefix: &str) -> Result<WatchStream> {
        let mut client = self.client.clone();
        let (mut watcher, mut stream) = client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await?;

        let (tx, watch_stream) = WatchStream::channel(self.watch_buffer);
        let prefix = prefix.to_string();

        // 转发任务：通知流 -> channel；接收端被丢弃时取消 etcd 订阅
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    message = stream.message() => match message {
                        Ok(Some(resp)) => {
                            if resp.canceled() {
                                warn!(prefix = %prefix, reason = %resp.cancel_reason(), "etcd watch canceled by server");
                                break;
                            }
                            let events = resp
                                .events()
                                .iter()
                                .filter_map(|event| {
                                    let kind = match event.event_type() {
                                        EventType::Put => EventKind::Put,
                                        EventType::Delete => EventKind::Delete,
                                    };
                                    event.kv().map(|kv| WatchEvent {
                                        kind,
                                        key: String::from_utf8_lossy(kv.key()).into_owned(),
                                    })
                                })
                                .collect::<Vec<_>>();
                            // created / progress 响应不携带事件
                            if events.is_empty() {
                                continue;
                            }
                            if tx.send(Ok(WatchBatch { events })).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!(prefix = %prefix, "etcd watch stream ended");
                            break;
                        }
                        Err(e) => {
                            // 流出错后不再可用，交给解析器重新订阅
                            let _ = tx.send(Err(e.into())).await;
                            break;
                        }
                    }
                }
            }

            if let Err(e) = watcher.cancel().await {
                debug!(prefix = %prefix, error = %e, "Failed to cancel etcd watcher");
            }
        });

        Ok(watch_stream)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut client = self.client.clone();
        client.put(key, value, None).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut client = self.client.clone();
        client.delete(key, None).await?;
        Ok(())
    }
}
