//! 测试公共工具

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use flare_resolver::{
    ClientConn, EtcdResolverBuilder, MemoryRegistry, Registrar, ResolverError, Result, State,
};

/// 记录每次推送的消费者
pub struct RecordingConn {
    updates: Mutex<Vec<Vec<String>>>,
    tx: mpsc::UnboundedSender<Vec<String>>,
    reject: AtomicBool,
}

impl RecordingConn {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                updates: Mutex::new(Vec::new()),
                tx,
                reject: AtomicBool::new(false),
            }),
            rx,
        )
    }

    /// 让后续推送返回错误
    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn updates(&self) -> Vec<Vec<String>> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl ClientConn for RecordingConn {
    async fn update_state(&self, state: State) -> Result<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ResolverError::Consumer("rejected by test".to_string()));
        }
        let addrs: Vec<String> = state.addresses.into_iter().map(|a| a.addr).collect();
        self.updates.lock().unwrap().push(addrs.clone());
        let _ = self.tx.send(addrs);
        Ok(())
    }
}

pub fn set(addrs: &[&str]) -> BTreeSet<String> {
    addrs.iter().map(|a| a.to_string()).collect()
}

pub fn as_set(addrs: &[String]) -> BTreeSet<String> {
    addrs.iter().cloned().collect()
}

/// 等待下一次推送
pub async fn next_update(rx: &mut mpsc::UnboundedReceiver<Vec<String>>) -> Vec<String> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for address update")
        .expect("update channel closed")
}

/// 断言在给定时间内没有推送
pub async fn assert_no_update(rx: &mut mpsc::UnboundedReceiver<Vec<String>>, wait: Duration) {
    if let Ok(Some(update)) = tokio::time::timeout(wait, rx.recv()).await {
        panic!("unexpected address update: {:?}", update);
    }
}

pub fn setup() -> (Arc<MemoryRegistry>, Registrar, EtcdResolverBuilder) {
    let registry = Arc::new(MemoryRegistry::new());
    let registrar = Registrar::new(registry.clone());
    let builder = EtcdResolverBuilder::new(registry.clone())
        .with_resubscribe_backoff(Duration::from_millis(10), Duration::from_millis(50));
    (registry, registrar, builder)
}

/// 轮询直到条件成立
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
