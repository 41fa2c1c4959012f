//! Postgres 基础设施层（eventum-postgres）
//!
//! 以 sqlx 实现领域层的持久化协议：
//! - 事件存储（`event_store`）：按流追加/读取事件行，唯一约束实现乐观并发；
//! - 事务性发件箱（`outbox`）：与状态变更同事务写入待投递消息；
//! - 处理账本（`processed`）：入站消息的幂等标记；
//! - 消费者行（`consumer_store`）：外部流位点的持久化；
//! - 工作单元（`unit_of_work`）：一个连接一个事务，统一绑定以上全部操作。
//!
//! 所有表操作都显式接收事务连接作为参数，不在对象上保存环境连接。
//!
pub mod consumer_store;
pub mod event_store;
pub mod outbox;
pub mod processed;
pub mod schema;
pub mod unit_of_work;

pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkFactory};
