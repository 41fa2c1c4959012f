//! 应用层运行时（eventum-application）
//!
//! 在领域层协议之上提供消息编排运行时：
//! - 消息总线（`message_bus`）：命令/事件分发与级联排空，严格 FIFO 因果轨迹；
//! - 处理器协议（`handler`）与幂等包装（`idempotent`）；
//! - 外部事件流消费（`consume`）：代理协议、消费引擎与位点推进；
//! - 内存版基础设施（`in_memory`）：测试、示例与本地开发。
//!
pub mod consume;
pub mod error;
pub mod handler;
pub mod idempotent;
pub mod in_memory;
pub mod message;
pub mod message_bus;

pub use consume::{
    BrokerPublisher, ConsumerConfig, ConsumerEngine, ConsumerEngineConfig, EngineHandle,
    StreamBroker, StreamRecord,
};
pub use error::AppError;
pub use handler::{CommandHandler, EventHandler};
pub use idempotent::Idempotent;
pub use in_memory::{InMemoryBroker, InMemoryStore, InMemoryUnitOfWork, InMemoryUnitOfWorkFactory};
pub use message::{CommandEnvelope, Message};
pub use message_bus::{EventPublisher, MessageBus, MessageBusBuilder};
