//! 工作单元（UnitOfWork）协议
//!
//! 一个工作单元对应恰好一个连接与一个事务，绝不跨任务共享或重入。
//! 在其生命周期内登记每一个被加载或保存的聚合实例（seen 集合），
//! 以便在成功退出时统一收集全部待持久化事件：写入事件存储、
//! 暂存到发件箱，然后提交；任何错误回滚整个事务。
//!
//! 丢弃一个未提交的工作单元等价于回滚。
//!
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::aggregate_root::AggregateRoot;
use crate::consumer::Consumer;
use crate::error::DomainResult;
use crate::persist::{StoredEvent, serialize_pending};

/// 已登记聚合的共享句柄
///
/// 工作单元通过该句柄保留对聚合实例的访问，处理器通过 `lock`
/// 获取可变访问。句柄克隆共享同一实例。
pub struct Tracked<A: Aggregate> {
    inner: Arc<Mutex<AggregateRoot<A>>>,
}

impl<A: Aggregate> Tracked<A> {
    pub fn new(root: AggregateRoot<A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(root)),
        }
    }

    /// 获取聚合根的独占访问
    pub async fn lock(&self) -> MutexGuard<'_, AggregateRoot<A>> {
        self.inner.lock().await
    }
}

impl<A: Aggregate> std::fmt::Debug for Tracked<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked").finish_non_exhaustive()
    }
}

impl<A: Aggregate> Clone for Tracked<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// 已登记聚合的类型擦除接口：排空待持久化缓冲并序列化
#[async_trait]
pub trait SeenAggregate: Send + Sync {
    async fn flush(&self) -> DomainResult<Vec<StoredEvent>>;
}

#[async_trait]
impl<A: Aggregate> SeenAggregate for Tracked<A> {
    async fn flush(&self) -> DomainResult<Vec<StoredEvent>> {
        let mut root = self.inner.lock().await;
        if !root.has_pending() {
            return Ok(Vec::new());
        }

        serialize_pending(&mut root)
    }
}

/// 工作单元：单一原子事务边界，绑定事件存储、发件箱与处理账本
#[async_trait]
pub trait UnitOfWork: Send + 'static {
    /// 加载聚合：读取流、经解码表重放，并登记到 seen 集合。
    /// 流中没有任何事件时返回 `NotFound`。
    async fn get<A: Aggregate>(&mut self, stream_id: Uuid) -> DomainResult<Tracked<A>>;

    /// 登记一个新建聚合到 seen 集合（不做即时写入）
    fn add<A: Aggregate>(&mut self, root: AggregateRoot<A>) -> Tracked<A>;

    /// 显式保存：排空该聚合的待持久化缓冲，连续分配位点，
    /// 写入事件存储并暂存到发件箱投递队列
    async fn save<A: Aggregate>(&mut self, aggregate: &Tracked<A>) -> DomainResult<()>;

    /// 处理账本：消息是否已处理
    async fn is_processed(&mut self, message_id: Uuid) -> DomainResult<bool>;

    /// 处理账本：标记消息已处理；重复标记返回 `DuplicateMessage`
    async fn mark_processed(&mut self, message_id: Uuid) -> DomainResult<()>;

    /// 读取消费者行
    async fn consumer(&mut self, id: Uuid) -> DomainResult<Consumer>;

    /// 列出全部消费者行
    async fn consumers(&mut self) -> DomainResult<Vec<Consumer>>;

    /// 新增消费者行
    async fn add_consumer(&mut self, consumer: &Consumer) -> DomainResult<()>;

    /// 更新消费者行（位点推进）
    async fn update_consumer(&mut self, consumer: &Consumer) -> DomainResult<()>;

    /// 成功退出：排空全部 seen 聚合的剩余待持久化事件，
    /// 为每条暂存事件写入发件箱行，提交事务，
    /// 返回本工作单元收集到的全部事件（供总线级联入队）
    async fn commit(self) -> DomainResult<Vec<StoredEvent>>;

    /// 失败退出：不排空，整体回滚
    async fn rollback(self) -> DomainResult<()>;
}

/// 工作单元工厂：每次从连接池获取独立连接并开启事务
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync + 'static {
    type Uow: UnitOfWork;

    async fn create(&self) -> DomainResult<Self::Uow>;
}
