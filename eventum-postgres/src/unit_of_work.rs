//! Postgres 工作单元（PgUnitOfWork）
//!
//! 一个工作单元持有一个从连接池获取的连接与其上开启的事务。
//! 生命周期内登记每一个被加载或保存的聚合；成功提交时排空全部
//! 待持久化事件、写入发件箱行并提交事务，任何错误整体回滚。
//! 丢弃未提交的工作单元由事务的丢弃语义完成回滚。
//!
use async_trait::async_trait;
use eventum_domain::aggregate::Aggregate;
use eventum_domain::aggregate_root::AggregateRoot;
use eventum_domain::consumer::Consumer;
use eventum_domain::error::{DomainError, DomainResult};
use eventum_domain::persist::{
    OutboxMessage, SeenAggregate, StoredEvent, Tracked, UnitOfWork, UnitOfWorkFactory,
    replay_stored,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{consumer_store, event_store, outbox, processed};

/// Postgres 工作单元
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    seen: Vec<Box<dyn SeenAggregate>>,
    staged: Vec<StoredEvent>,
}

impl PgUnitOfWork {
    /// 追加一批已序列化事件并暂存为待投递消息
    async fn stage(&mut self, events: Vec<StoredEvent>) -> DomainResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        event_store::append(&mut self.tx, &events).await?;
        self.staged.extend(events);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn get<A: Aggregate>(&mut self, stream_id: Uuid) -> DomainResult<Tracked<A>> {
        let rows = event_store::read_stream(&mut self.tx, stream_id).await?;

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
        processed::is_processed(&mut self.tx, message_id).await
    }

    async fn mark_processed(&mut self, message_id: Uuid) -> DomainResult<()> {
        processed::mark_processed(&mut self.tx, message_id).await
    }

    async fn consumer(&mut self, id: Uuid) -> DomainResult<Consumer> {
        consumer_store::get(&mut self.tx, id).await
    }

    async fn consumers(&mut self) -> DomainResult<Vec<Consumer>> {
        consumer_store::list(&mut self.tx).await
    }

    async fn add_consumer(&mut self, consumer: &Consumer) -> DomainResult<()> {
        consumer_store::insert(&mut self.tx, consumer).await
    }

    async fn update_consumer(&mut self, consumer: &Consumer) -> DomainResult<()> {
        consumer_store::update(&mut self.tx, consumer).await
    }

    async fn commit(mut self) -> DomainResult<Vec<StoredEvent>> {
        // 先排空全部已登记聚合的剩余待持久化事件，
        // 处理器未显式保存的间接变更也在此收集
        let seen = std::mem::take(&mut self.seen);
        for aggregate in &seen {
            let events = aggregate.flush().await?;
            self.stage(events).await?;
        }

        let messages = self
            .staged
            .iter()
            .map(OutboxMessage::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        outbox::send(&mut self.tx, &messages).await?;

        self.tx.commit().await?;

        Ok(self.staged)
    }

    async fn rollback(self) -> DomainResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Postgres 工作单元工厂：每次从池中获取独立连接并开启事务
#[derive(Clone)]
pub struct PgUnitOfWorkFactory {
    pool: PgPool,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    type Uow = PgUnitOfWork;

    async fn create(&self) -> DomainResult<PgUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork {
            tx,
            seen: Vec::new(),
            staged: Vec::new(),
        })
    }
}
