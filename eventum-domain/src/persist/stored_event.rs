//! 事件持久化模型（StoredEvent）
//!
//! 定义事件在持久化层与总线/外部流上的标准形态，并提供
//! 待持久化缓冲的序列化（含位点分配）与按历史行重放的工具函数。
//!
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::aggregate_root::AggregateRoot;
use crate::domain_event::{DomainEvent, domain_of};
use crate::error::{DomainError, DomainResult};

/// 已序列化的事件记录
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct StoredEvent {
    /// 事件唯一标识符
    event_id: Uuid,
    /// 聚合流标识（事件所属聚合实例）
    stream_id: Uuid,
    /// 事件类型判别符，同时作为外部流名
    event_type: String,
    /// 流内位点，从 0 起连续递增
    version: i64,
    /// 事件产生时间
    created: DateTime<Utc>,
    /// 事件负载
    data: Value,
}

impl StoredEvent {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// 事件所属的域（类型判别符的前缀）
    pub fn domain(&self) -> &str {
        domain_of(&self.event_type)
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// 排空聚合根的待持久化缓冲，按当前位点连续分配版本并序列化。
/// 判别符未在聚合解码表中注册的事件拒绝持久化（完整性校验）。
/// 全部序列化成功后推进聚合根位点。
pub fn serialize_pending<A: Aggregate>(
    root: &mut AggregateRoot<A>,
) -> DomainResult<Vec<StoredEvent>> {
    let envelopes = root.drain();
    let stream_id = root.stream_id();

    let mut version = root.version();
    let mut stored = Vec::with_capacity(envelopes.len());

    for envelope in envelopes {
        version = version.next();
        let (event_id, occurred_at, payload) = envelope.into_parts();
        let event_type = payload.event_type();

        if !A::event_codec().contains(event_type) {
            return Err(DomainError::UnknownEventType {
                event_type: event_type.to_string(),
            });
        }

        stored.push(
            StoredEvent::builder()
                .event_id(event_id)
                .stream_id(stream_id)
                .event_type(event_type.to_string())
                .version(version.value())
                .created(occurred_at)
                .data(serde_json::to_value(&payload)?)
                .build(),
        );
    }

    root.set_version(version);

    Ok(stored)
}

/// 通过聚合解码表将历史行解码为类型化事件并重放为聚合根。
/// 行需按位点升序给出。
pub fn replay_stored<A: Aggregate>(
    stream_id: Uuid,
    rows: Vec<StoredEvent>,
) -> DomainResult<AggregateRoot<A>> {
    let codec = A::event_codec();

    let mut history = Vec::with_capacity(rows.len());
    for row in rows {
        history.push(codec.decode(&row.event_type, row.data)?);
    }

    AggregateRoot::replay(stream_id, history)
}
