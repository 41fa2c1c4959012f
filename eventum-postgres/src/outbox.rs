//! 事务性发件箱（outbox）
//!
//! 仅在调用方事务内写入 `message_outbox` 行，从不直接对外发布：
//! "聚合状态已变更"与"事件已被持久记录以待投递"共同成败，
//! 消除双写不一致。实际投递由独立中继进程完成（至少一次）。
//!
use eventum_domain::error::DomainResult;
use eventum_domain::persist::OutboxMessage;
use sqlx::PgConnection;

/// 每条消息写入一行发件箱
pub async fn send(conn: &mut PgConnection, messages: &[OutboxMessage]) -> DomainResult<()> {
    for message in messages {
        sqlx::query(
            r#"
            INSERT INTO
                message_outbox (id, type, data)
            VALUES
                ($1, $2, $3)
            "#,
        )
        .bind(message.id())
        .bind(message.message_type())
        .bind(message.data())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
