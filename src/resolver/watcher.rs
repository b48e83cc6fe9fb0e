//! etcd 解析器与后台 watch 任务

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ClientConn, RefreshOutcome, Resolver, ResolverState, State, Target};
use crate::cache::{AddressCache, Snapshot};
use crate::error::{ResolverError, Result};
use crate::instance::ServiceRecord;
use crate::policy::SelectionPolicy;
use crate::registry::{RegistryClient, WatchStream};
use crate::retry::ExponentialBackoff;

const STATE_CREATED: u8 = 0;
const STATE_WATCHING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// 解析器与 watch 任务共享的状态
pub(crate) struct ResolverInner {
    target: Target,
    prefix: String,
    registry: Arc<dyn RegistryClient>,
    policy: Arc<dyn SelectionPolicy>,
    conn: Arc<dyn ClientConn>,
    cache: AddressCache,
    cancel: CancellationToken,
    resubscribe_base: Duration,
    resubscribe_max: Duration,
    /// 串行化刷新：同一时刻只有一个刷新周期在写缓存和推送
    refresh_lock: Mutex<()>,
    state: AtomicU8,
}

impl ResolverInner {
    pub(crate) fn new(
        target: Target,
        prefix: String,
        registry: Arc<dyn RegistryClient>,
        policy: Arc<dyn SelectionPolicy>,
        conn: Arc<dyn ClientConn>,
        resubscribe_base: Duration,
        resubscribe_max: Duration,
    ) -> Self {
        Self {
            target,
            prefix,
            registry,
            policy,
            conn,
            cache: AddressCache::new(),
            cancel: CancellationToken::new(),
            resubscribe_base,
            resubscribe_max,
            refresh_lock: Mutex::new(()),
            state: AtomicU8::new(STATE_CREATED),
        }
    }

    /// 一个完整的刷新周期：快照读取 -> 重建缓存 -> 选择 -> 推送
    async fn refresh(&self) -> Result<RefreshOutcome> {
        let _guard = self.refresh_lock.lock().await;
        if self.cancel.is_cancelled() {
            return Ok(RefreshOutcome::Closed);
        }

        let kvs = self.registry.get_prefix(&self.prefix).await?;
        if self.cancel.is_cancelled() {
            return Ok(RefreshOutcome::Closed);
        }

        let snapshot: Snapshot = kvs
            .into_iter()
            .map(|kv| {
                let record = ServiceRecord::decode(&kv.value);
                (kv.key, record)
            })
            .collect();
        self.cache.replace(snapshot);

        let addresses = self.policy.select(&self.cache.snapshot());
        if addresses.is_empty() {
            info!(target_uri = %self.target, "No addresses available, keeping last pushed state");
            return Ok(RefreshOutcome::Suppressed);
        }

        if self.cancel.is_cancelled() {
            return Ok(RefreshOutcome::Closed);
        }

        let count = addresses.len();
        info!(
            target_uri = %self.target,
            addresses = ?addresses.iter().map(|a| a.addr.as_str()).collect::<Vec<_>>(),
            "Selected addresses"
        );
        self.conn.update_state(State::new(addresses)).await?;

        Ok(RefreshOutcome::Pushed(count))
    }

    async fn refresh_logged(&self) {
        if let Err(e) = self.refresh().await {
            warn!(target_uri = %self.target, error = %e, "Failed to refresh addresses");
        }
    }

    fn state(&self) -> ResolverState {
        match self.state.load(Ordering::SeqCst) {
            STATE_CREATED => ResolverState::Created,
            STATE_WATCHING => ResolverState::Watching,
            _ => ResolverState::Closed,
        }
    }

    fn close(&self) {
        self.cancel.cancel();
        self.state.store(STATE_CLOSED, Ordering::SeqCst);
    }
}

/// 基于注册中心 watch 的解析器
///
/// 每个实例拥有一个地址缓存、一个取消句柄和一个后台 watch 任务。
/// 丢弃解析器等同于调用 [`Resolver::close`]。
pub struct EtcdResolver {
    inner: Arc<ResolverInner>,
}

impl EtcdResolver {
    /// 执行首次同步刷新并启动后台 watch 任务
    ///
    /// 首次刷新失败属于构建期错误。
    pub(crate) async fn start(inner: ResolverInner, stream: WatchStream) -> Result<Self> {
        let resolver = Self {
            inner: Arc::new(inner),
        };

        match resolver.inner.refresh().await {
            Ok(outcome) => {
                debug!(target_uri = %resolver.inner.target, ?outcome, "Initial resolution finished");
            }
            // 消费者拒绝不影响解析器本身，下一次刷新会重试推送
            Err(ResolverError::Consumer(reason)) => {
                warn!(target_uri = %resolver.inner.target, %reason, "Initial update rejected by consumer");
            }
            Err(e) => return Err(e),
        }

        // close() 可能已经先一步执行，不能把 Closed 覆盖回 Watching
        let _ = resolver.inner.state.compare_exchange(
            STATE_CREATED,
            STATE_WATCHING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        tokio::spawn(watch_loop(resolver.inner.clone(), stream));

        Ok(resolver)
    }

    /// 刷新一次并返回结果
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        self.inner.refresh().await
    }

    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// 监听的注册中心前缀
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    pub fn state(&self) -> ResolverState {
        self.inner.state()
    }

    /// 地址缓存（只读）
    pub fn cache(&self) -> &AddressCache {
        &self.inner.cache
    }

    /// 缓存内容的副本，供选择策略以外的调用方查看权重和元数据
    pub fn service_records(&self) -> Snapshot {
        self.inner.cache.to_map()
    }
}

#[async_trait]
impl Resolver for EtcdResolver {
    async fn resolve_now(&self) {
        self.inner.refresh_logged().await;
    }

    fn close(&self) {
        if self.inner.state() != ResolverState::Closed {
            info!(target_uri = %self.inner.target, "Closing resolver");
        }
        self.inner.close();
    }
}

impl Drop for EtcdResolver {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// 后台 watch 循环
///
/// 每收到一批通知或一个流错误都执行一次完整刷新；流结束后按退避重新订阅。
async fn watch_loop(inner: Arc<ResolverInner>, mut stream: WatchStream) {
    let mut backoff = ExponentialBackoff::new(inner.resubscribe_base, inner.resubscribe_max);

    loop {
        let next = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            next = stream.next_batch() => next,
        };

        match next {
            Some(Ok(batch)) => {
                debug!(
                    target_uri = %inner.target,
                    events = batch.events.len(),
                    "Registry changed, updating addresses"
                );
            }
            Some(Err(e)) => {
                warn!(target_uri = %inner.target, error = %e, "Watch error");
            }
            None => {
                warn!(target_uri = %inner.target, "Watch stream ended, resubscribing");
                match resubscribe(&inner, &mut backoff).await {
                    Some(new_stream) => stream = new_stream,
                    None => break,
                }
            }
        }

        if inner.cancel.is_cancelled() {
            break;
        }
        inner.refresh_logged().await;
    }

    debug!(target_uri = %inner.target, "Watch task stopped");
}

async fn resubscribe(
    inner: &ResolverInner,
    backoff: &mut ExponentialBackoff,
) -> Option<WatchStream> {
    loop {
        let delay = backoff.next_delay();
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        match inner.registry.watch(&inner.prefix).await {
            Ok(stream) => {
                backoff.reset();
                info!(target_uri = %inner.target, prefix = %inner.prefix, "Watch resubscribed");
                return Some(stream);
            }
            Err(e) => {
                warn!(target_uri = %inner.target, error = %e, "Failed to resubscribe watch");
            }
        }
    }
}
