//! 注册中心客户端抽象
//!
//! 解析器与注册器只依赖这里定义的四个操作：前缀读取、前缀订阅、写入和删除。

pub mod etcd;
pub mod memory;

pub use etcd::EtcdRegistry;
pub use memory::MemoryRegistry;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::error::Result;

/// 注册中心中的一个键值对
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// 变更事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Put,
    Delete,
}

/// 单个变更事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub key: String,
}

/// 一批变更通知
///
/// 解析器只把它当作"需要刷新"的信号，不做增量应用。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchBatch {
    pub events: Vec<WatchEvent>,
}

/// 变更通知流
///
/// 由注册中心客户端的后台转发任务写入；丢弃该流即释放底层订阅。
pub struct WatchStream {
    rx: mpsc::Receiver<Result<WatchBatch>>,
}

impl WatchStream {
    /// 创建通知流及其发送端
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<WatchBatch>>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }

    /// 等待下一批通知；返回 `None` 表示订阅已结束
    pub async fn next_batch(&mut self) -> Option<Result<WatchBatch>> {
        self.rx.recv().await
    }
}

impl Stream for WatchStream {
    type Item = Result<WatchBatch>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// 注册中心客户端 trait
///
/// 同一个客户端在一个构建器创建的所有解析器之间共享。
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// 读取前缀下的全部键值（完整快照）
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>>;

    /// 订阅前缀下的变更
    async fn watch(&self, prefix: &str) -> Result<WatchStream>;

    /// 写入（覆盖）一个键
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// 删除一个键
    async fn delete(&self, key: &str) -> Result<()>;
}
