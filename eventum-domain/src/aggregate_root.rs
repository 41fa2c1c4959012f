//! 聚合根（AggregateRoot）
//!
//! 封装聚合实例的标识、已提交位点与待持久化事件缓冲：
//! - `new_event` 仅追加到缓冲，不产生状态副作用；
//! - `record` 先应用转移函数再追加；
//! - `drain` 原子交换缓冲并返回其全部内容；
//! - `replay` 从零值状态按流序折叠历史事件重建聚合（不填充缓冲）。
//!
use std::ops::Deref;

use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::domain_event::EventEnvelope;
use crate::error::DomainResult;
use crate::value_object::Version;

/// 聚合根：一致性边界的运行时载体
#[derive(Debug)]
pub struct AggregateRoot<A: Aggregate> {
    stream_id: Uuid,
    version: Version,
    state: A,
    pending: Vec<EventEnvelope<A::Event>>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// 工厂：创建新聚合并分配标识
    pub fn create() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// 工厂：以给定标识创建新聚合
    pub fn with_id(stream_id: Uuid) -> Self {
        Self {
            stream_id,
            version: Version::new(),
            state: A::default(),
            pending: Vec::new(),
        }
    }

    /// 重放历史事件，重建聚合状态。
    /// 重放得到的事件是历史而非新事件，不进入待持久化缓冲。
    pub fn replay(stream_id: Uuid, history: Vec<A::Event>) -> DomainResult<Self> {
        let mut state = A::default();
        for event in &history {
            state.mutate(event)?;
        }

        Ok(Self {
            stream_id,
            version: Version::from_value(history.len() as i64 - 1),
            state,
            pending: Vec::new(),
        })
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    /// 最后一条已提交事件的位点
    pub fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    /// 追加待持久化事件（不产生状态副作用）
    pub fn new_event(&mut self, event: A::Event) {
        self.pending.push(EventEnvelope::new(event));
    }

    /// 先通过 `mutate` 应用事件，再追加到待持久化缓冲
    pub fn record(&mut self, event: A::Event) -> DomainResult<()> {
        self.state.mutate(&event)?;
        self.new_event(event);
        Ok(())
    }

    pub fn pending(&self) -> &[EventEnvelope<A::Event>] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 原子交换待持久化缓冲，返回其先前全部内容
    pub fn drain(&mut self) -> Vec<EventEnvelope<A::Event>> {
        std::mem::take(&mut self.pending)
    }
}

impl<A: Aggregate> Deref for AggregateRoot<A> {
    type Target = A;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}
