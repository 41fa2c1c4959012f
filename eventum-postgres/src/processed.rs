//! 处理账本（processed）
//!
//! 入站消息标识的幂等标记，与命令的业务效果共享同一事务。
//!
use eventum_domain::error::{DomainError, DomainResult};
use sqlx::{PgConnection, Row};
use uuid::Uuid;

/// 消息是否已处理
pub async fn is_processed(conn: &mut PgConnection, message_id: Uuid) -> DomainResult<bool> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT
                1
            FROM
                processed_messages
            WHERE
                id = $1
        )
        "#,
    )
    .bind(message_id)
    .fetch_one(&mut *conn)
    .await?;

    row.try_get::<bool, _>(0).map_err(DomainError::from)
}

/// 标记消息已处理。重复插入映射为 `DuplicateMessage`，
/// 从不静默接受第二次标记。
pub async fn mark_processed(conn: &mut PgConnection, message_id: Uuid) -> DomainResult<()> {
    sqlx::query(
        r#"
        INSERT INTO
            processed_messages (id)
        VALUES
            ($1)
        "#,
    )
    .bind(message_id)
    .execute(&mut *conn)
    .await
    .map_err(|err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DomainError::DuplicateMessage { message_id };
            }
        }
        DomainError::from(err)
    })?;

    Ok(())
}
