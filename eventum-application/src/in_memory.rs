//! 内存版基础设施（InMemory*）
//!
//! 工作单元与事件流代理的轻量实现，满足与 Postgres 实现相同的协议：
//! 提交前的写入仅在本工作单元内可见，提交时整体应用，回滚即丢弃。
//! 典型用途：测试环境、示例与本地开发（不提供真实持久性）。
//!
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use eventum_domain::aggregate::Aggregate;
use eventum_domain::aggregate_root::AggregateRoot;
use eventum_domain::consumer::Consumer;
use eventum_domain::error::{DomainError, DomainResult};
use eventum_domain::persist::{
    OutboxMessage, SeenAggregate, StoredEvent, Tracked, UnitOfWork, UnitOfWorkFactory,
    replay_stored,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::consume::{StreamBroker, StreamRecord};

#[derive(Default)]
struct MemState {
    events: HashMap<Uuid, Vec<StoredEvent>>,
    outbox: Vec<OutboxMessage>,
    processed: HashSet<Uuid>,
    consumers: HashMap<Uuid, Consumer>,
}

/// 共享内存存储：事件表、发件箱、处理账本与消费者表
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- 检视接口（测试与诊断用）----

    pub async fn events(&self, stream_id: Uuid) -> Vec<StoredEvent> {
        let state = self.state.lock().await;
        state.events.get(&stream_id).cloned().unwrap_or_default()
    }

    pub async fn outbox(&self) -> Vec<OutboxMessage> {
        self.state.lock().await.outbox.clone()
    }

    pub async fn is_processed(&self, message_id: Uuid) -> bool {
        self.state.lock().await.processed.contains(&message_id)
    }

    pub async fn consumers(&self) -> Vec<Consumer> {
        self.state.lock().await.consumers.values().cloned().collect()
    }
}

/// 内存版工作单元
pub struct InMemoryUnitOfWork {
    store: InMemoryStore,
    seen: Vec<Box<dyn SeenAggregate>>,
    staged: Vec<StoredEvent>,
    processed_marks: Vec<Uuid>,
    consumer_adds: Vec<Consumer>,
    consumer_updates: Vec<Consumer>,
}

impl InMemoryUnitOfWork {
    fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            seen: Vec::new(),
            staged: Vec::new(),
            processed_marks: Vec::new(),
            consumer_adds: Vec::new(),
            consumer_updates: Vec::new(),
        }
    }

    /// 暂存一批已序列化事件，检测与既有行或本单元内暂存行的位点冲突
    async fn stage(&mut self, events: Vec<StoredEvent>) -> DomainResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let state = self.store.state.lock().await;
        for event in &events {
            let committed_conflict = state
                .events
                .get(&event.stream_id())
                .is_some_and(|rows| rows.iter().any(|row| row.version() == event.version()));
            let staged_conflict = self.staged.iter().any(|staged| {
                staged.stream_id() == event.stream_id() && staged.version() == event.version()
            });

            if committed_conflict || staged_conflict {
                return Err(DomainError::DuplicateVersion {
                    stream_id: event.stream_id(),
                    version: event.version(),
                });
            }
        }
        drop(state);

        self.staged.extend(events);
        Ok(())
    }

    fn pending_consumer(&self, id: Uuid) -> Option<&Consumer> {
        self.consumer_updates
            .iter()
            .rev()
            .chain(self.consumer_adds.iter().rev())
            .find(|consumer| consumer.id() == id)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn get<A: Aggregate>(&mut self, stream_id: Uuid) -> DomainResult<Tracked<A>> {
        let mut rows = {
            let state = self.store.state.lock().await;
            state.events.get(&stream_id).cloned().unwrap_or_default()
        };
        rows.extend(
            self.staged
                .iter()
                .filter(|event| event.stream_id() == stream_id)
                .cloned(),
        );
        rows.sort_by_key(StoredEvent::version);

        if rows.is_empty() {
            return Err(DomainError::NotFound {
                reason: format!("stream {stream_id} has no events"),
            });
        }

        let root = replay_stored::<A>(stream_id, rows)?;
        let tracked = Tracked::new(root);
        self.seen.push(Box::new(tracked.clone()));
        Ok(tracked)
    }

    fn add<A: Aggregate>(&mut self, root: AggregateRoot<A>) -> Tracked<A> {
        let tracked = Tracked::new(root);
        self.seen.push(Box::new(tracked.clone()));
        tracked
    }

    async fn save<A: Aggregate>(&mut self, aggregate: &Tracked<A>) -> DomainResult<()> {
        let events = aggregate.flush().await?;
        self.stage(events).await
    }

    async fn is_processed(&mut self, message_id: Uuid) -> DomainResult<bool> {
        if self.processed_marks.contains(&message_id) {
            return Ok(true);
        }
        Ok(self.store.is_processed(message_id).await)
    }

    async fn mark_processed(&mut self, message_id: Uuid) -> DomainResult<()> {
        if self.processed_marks.contains(&message_id) || self.store.is_processed(message_id).await
        {
            return Err(DomainError::DuplicateMessage { message_id });
        }
        self.processed_marks.push(message_id);
        Ok(())
    }

    async fn consumer(&mut self, id: Uuid) -> DomainResult<Consumer> {
        if let Some(consumer) = self.pending_consumer(id) {
            return Ok(consumer.clone());
        }

        let state = self.store.state.lock().await;
        state
            .consumers
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound {
                reason: format!("consumer {id} not found"),
            })
    }

    async fn consumers(&mut self) -> DomainResult<Vec<Consumer>> {
        let mut merged: HashMap<Uuid, Consumer> = {
            let state = self.store.state.lock().await;
            state.consumers.clone()
        };
        for consumer in self.consumer_adds.iter().chain(self.consumer_updates.iter()) {
            merged.insert(consumer.id(), consumer.clone());
        }
        Ok(merged.into_values().collect())
    }

    async fn add_consumer(&mut self, consumer: &Consumer) -> DomainResult<()> {
        self.consumer_adds.push(consumer.clone());
        Ok(())
    }

    async fn update_consumer(&mut self, consumer: &Consumer) -> DomainResult<()> {
        self.consumer_updates.push(consumer.clone());
        Ok(())
    }

    async fn commit(mut self) -> DomainResult<Vec<StoredEvent>> {
        // 先排空全部已登记聚合的剩余待持久化事件
        let seen = std::mem::take(&mut self.seen);
        for aggregate in &seen {
            let events = aggregate.flush().await?;
            self.stage(events).await?;
        }

        let mut state = self.store.state.lock().await;

        // 位点冲突复查：其他工作单元可能在本单元暂存之后先行提交
        for event in &self.staged {
            let conflict = state
                .events
                .get(&event.stream_id())
                .is_some_and(|rows| rows.iter().any(|row| row.version() == event.version()));
            if conflict {
                return Err(DomainError::DuplicateVersion {
                    stream_id: event.stream_id(),
                    version: event.version(),
                });
            }
        }

        for message_id in &self.processed_marks {
            if state.processed.contains(message_id) {
                return Err(DomainError::DuplicateMessage {
                    message_id: *message_id,
                });
            }
        }

        for event in &self.staged {
            let message = OutboxMessage::try_from(event)?;
            let rows = state.events.entry(event.stream_id()).or_default();
            rows.push(event.clone());
            rows.sort_by_key(StoredEvent::version);
            state.outbox.push(message);
        }

        for message_id in self.processed_marks.drain(..) {
            state.processed.insert(message_id);
        }

        for consumer in self.consumer_adds.drain(..) {
            state.consumers.insert(consumer.id(), consumer);
        }

        for consumer in self.consumer_updates.drain(..) {
            if !state.consumers.contains_key(&consumer.id()) {
                return Err(DomainError::NotFound {
                    reason: format!("consumer {} not found", consumer.id()),
                });
            }
            state.consumers.insert(consumer.id(), consumer);
        }

        Ok(self.staged)
    }

    async fn rollback(self) -> DomainResult<()> {
        Ok(())
    }
}

/// 内存版工作单元工厂
#[derive(Clone, Default)]
pub struct InMemoryUnitOfWorkFactory {
    store: InMemoryStore,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new(store: InMemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    type Uow = InMemoryUnitOfWork;

    async fn create(&self) -> DomainResult<InMemoryUnitOfWork> {
        Ok(InMemoryUnitOfWork::new(self.store.clone()))
    }
}

/// 内存版事件流代理：每个流维护一条追加序列，记录标识为 1 起的序号
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    streams: Arc<Mutex<HashMap<String, Vec<StreamRecord>>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamBroker for InMemoryBroker {
    async fn append(&self, stream: &str, data: serde_json::Value) -> anyhow::Result<String> {
        let mut streams = self.streams.lock().await;
        let records = streams.entry(stream.to_string()).or_default();
        let record_id = (records.len() + 1).to_string();
        records.push(StreamRecord {
            record_id: record_id.clone(),
            data,
        });
        Ok(record_id)
    }

    async fn read_after(
        &self,
        stream: &str,
        offset: &str,
        max_count: usize,
    ) -> anyhow::Result<Vec<StreamRecord>> {
        let streams = self.streams.lock().await;
        let Some(records) = streams.get(stream) else {
            return Ok(Vec::new());
        };

        let skip: usize = offset.parse().unwrap_or(0);
        Ok(records.iter().skip(skip).take(max_count).cloned().collect())
    }

    async fn tip(&self, stream: &str) -> anyhow::Result<String> {
        let streams = self.streams.lock().await;
        let len = streams.get(stream).map_or(0, Vec::len);
        Ok(len.to_string())
    }
}
