//! tonic balance channel 适配
//!
//! 把解析器推送的完整地址列表转换为 `tower::discover::Change` 增量事件，
//! 交给 `tonic::transport::Channel::balance_channel` 维护连接。

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tonic::transport::{Channel, Endpoint};
use tonic::transport::channel::Change;
use tracing::{debug, warn};

use crate::error::{ResolverError, Result};
use crate::resolver::{ClientConn, State};

/// balance channel 消费者
pub struct BalanceChannelConn {
    tx: mpsc::Sender<Change<String, Endpoint>>,
    /// 已下发给 channel 的地址
    endpoints: Mutex<HashSet<String>>,
    connect_timeout: Option<Duration>,
}

impl BalanceChannelConn {
    pub fn new(tx: mpsc::Sender<Change<String, Endpoint>>) -> Self {
        Self {
            tx,
            endpoints: Mutex::new(HashSet::new()),
            connect_timeout: None,
        }
    }

    /// 创建 balance channel 以及对应的消费者
    pub fn channel(capacity: usize) -> (Channel, Self) {
        let (channel, tx) = Channel::balance_channel(capacity);
        (channel, Self::new(tx))
    }

    /// 设置新端点的连接超时
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// 当前已下发的地址
    pub async fn endpoints(&self) -> HashSet<String> {
        self.endpoints.lock().await.clone()
    }

    fn endpoint(&self, addr: &str) -> Option<Endpoint> {
        match Endpoint::from_shared(format!("http://{}", addr)) {
            Ok(endpoint) => Some(match self.connect_timeout {
                Some(timeout) => endpoint.connect_timeout(timeout),
                None => endpoint,
            }),
            Err(e) => {
                warn!(addr = %addr, error = %e, "Skipping invalid endpoint address");
                None
            }
        }
    }

    async fn send(&self, change: Change<String, Endpoint>) -> Result<()> {
        self.tx
            .send(change)
            .await
            .map_err(|_| ResolverError::Consumer("balance channel closed".to_string()))
    }
}

#[async_trait]
impl ClientConn for BalanceChannelConn {
    async fn update_state(&self, state: State) -> Result<()> {
        let mut current = self.endpoints.lock().await;
        let next: HashSet<String> = state.addresses.into_iter().map(|a| a.addr).collect();

        let removed: Vec<String> = current.difference(&next).cloned().collect();
        for addr in removed {
            self.send(Change::Remove(addr.clone())).await?;
            debug!(addr = %addr, "Endpoint removed");
            current.remove(&addr);
        }

        let added: Vec<String> = next.difference(&current).cloned().collect();
        for addr in added {
            let Some(endpoint) = self.endpoint(&addr) else {
                continue;
            };
            self.send(Change::Insert(addr.clone(), endpoint)).await?;
            debug!(addr = %addr, "Endpoint inserted");
            current.insert(addr);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Address;

    fn state(addrs: &[&str]) -> State {
        State::new(addrs.iter().map(|a| Address::new(*a)).collect())
    }

    #[tokio::test]
    async fn sends_only_differences() {
        let (tx, mut rx) = mpsc::channel(16);
        let conn = BalanceChannelConn::new(tx);

        conn.update_state(state(&["10.0.0.1:9000", "10.0.0.2:9000"]))
            .await
            .unwrap();
        let mut inserted = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                Change::Insert(key, _) => inserted.push(key),
                Change::Remove(key) => panic!("unexpected removal of {key}"),
            }
        }
        inserted.sort();
        assert_eq!(inserted, vec!["10.0.0.1:9000", "10.0.0.2:9000"]);

        conn.update_state(state(&["10.0.0.2:9000", "10.0.0.3:9000"]))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await.unwrap(), Change::Remove(k) if k == "10.0.0.1:9000"));
        assert!(matches!(rx.recv().await.unwrap(), Change::Insert(k, _) if k == "10.0.0.3:9000"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_channel_is_consumer_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let conn = BalanceChannelConn::new(tx);

        let err = conn.update_state(state(&["10.0.0.1:9000"])).await.unwrap_err();
        assert!(matches!(err, ResolverError::Consumer(_)));
        assert!(conn.endpoints().await.is_empty());
    }
}
