//! 持久化协议（persist）
//!
//! 定义事件溯源核心的持久化协议与通用装配逻辑，支持：
//! - 事件持久化模型与序列化/重放（`StoredEvent`、`serialize_pending`、`replay_stored`）；
//! - 事务性发件箱消息（`OutboxMessage`）；
//! - 工作单元协议（`UnitOfWork`/`UnitOfWorkFactory`）与已登记聚合句柄（`Tracked`）。
//!
//! 该模块聚焦协议与装配逻辑，具体存储后端（如 Postgres）由上层提供实现并注入。
//!
mod outbox_message;
mod stored_event;
mod unit_of_work;

pub use outbox_message::OutboxMessage;
pub use stored_event::{StoredEvent, replay_stored, serialize_pending};
pub use unit_of_work::{SeenAggregate, Tracked, UnitOfWork, UnitOfWorkFactory};
