use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain_event::DomainEvent;

/// 事件信封：为待持久化的事件载荷补充消息标识与产生时间。
/// 事件一经创建即不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope<E: DomainEvent> {
    event_id: Uuid,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(payload: E) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    pub(crate) fn into_parts(self) -> (Uuid, DateTime<Utc>, E) {
        (self.event_id, self.occurred_at, self.payload)
    }
}
