//! 发件箱消息（OutboxMessage）
//!
//! 与产生事件的状态变更共享同一事务写入 `message_outbox` 表的行，
//! 由独立的中继进程稍后投递到外部代理。
//!
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::persist::StoredEvent;

/// 发件箱中的一条待投递消息
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct OutboxMessage {
    id: Uuid,
    message_type: String,
    data: Value,
}

impl OutboxMessage {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl TryFrom<&StoredEvent> for OutboxMessage {
    type Error = serde_json::Error;

    fn try_from(event: &StoredEvent) -> Result<Self, Self::Error> {
        Ok(OutboxMessage {
            id: event.event_id(),
            message_type: event.event_type().to_string(),
            data: serde_json::to_value(event)?,
        })
    }
}
