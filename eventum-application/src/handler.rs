//! 处理器协议（EventHandler / CommandHandler）
//!
//! 处理器在总线分配的全新工作单元内运行，对聚合的全部变更
//! 与处理账本标记共享同一事务。
//!
use async_trait::async_trait;
use eventum_domain::message::Command;
use eventum_domain::persist::{StoredEvent, UnitOfWork};

/// 事件处理器：消费某一类型的事件
#[async_trait]
pub trait EventHandler<U: UnitOfWork>: Send + Sync {
    /// 处理器名称（用于失败日志与审计）
    fn name(&self) -> &str;

    /// 处理事件
    async fn handle(&self, uow: &mut U, event: &StoredEvent) -> anyhow::Result<()>;
}

/// 命令处理器：命令与处理器一一对应
#[async_trait]
pub trait CommandHandler<U: UnitOfWork, C: Command>: Send + Sync {
    async fn handle(&self, uow: &mut U, command: C) -> anyhow::Result<()>;
}
