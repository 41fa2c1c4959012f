//! 幂等事件处理包装（Idempotent）
//!
//! 以处理账本保护被包装的处理器：同一消息标识只生效一次。
//! 账本标记与处理器的业务效果共享同一工作单元事务，
//! 因而崩溃不会留下"已生效未标记"或相反的中间态。
//!
//! 注意：账本以消息标识为主键。多个处理器消费同一事件时，
//! 各处理器应使用各自的消费者身份派生消息（或独立账本），
//! 本包装适用于每条消息恰有一个受保护处理器的场合。
//!
use async_trait::async_trait;
use eventum_domain::persist::{StoredEvent, UnitOfWork};

use crate::handler::EventHandler;

/// 被处理账本保护的事件处理器
pub struct Idempotent<H> {
    inner: H,
}

impl<H> Idempotent<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<U, H> EventHandler<U> for Idempotent<H>
where
    U: UnitOfWork,
    H: EventHandler<U>,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn handle(&self, uow: &mut U, event: &StoredEvent) -> anyhow::Result<()> {
        if uow.is_processed(event.event_id()).await? {
            return Ok(());
        }

        self.inner.handle(uow, event).await?;
        uow.mark_processed(event.event_id()).await?;

        Ok(())
    }
}
