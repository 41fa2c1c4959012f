//! 消费者行（consumer_store）
//!
//! 外部流消费位点的持久化。位点更新必须与触发它的分发
//! 处于同一工作单元事务。
//!
use eventum_domain::consumer::Consumer;
use eventum_domain::error::{DomainError, DomainResult};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

/// 按标识读取消费者行
pub async fn get(conn: &mut PgConnection, id: Uuid) -> DomainResult<Consumer> {
    let row = sqlx::query(
        r#"
        SELECT
            id, stream, name, acked_id, retroactive
        FROM
            consumer
        WHERE
            id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => consumer_from_row(&row),
        None => Err(DomainError::NotFound {
            reason: format!("consumer {id} not found"),
        }),
    }
}

/// 列出全部消费者行
pub async fn list(conn: &mut PgConnection) -> DomainResult<Vec<Consumer>> {
    let rows = sqlx::query(
        r#"
        SELECT
            id, stream, name, acked_id, retroactive
        FROM
            consumer
        ORDER BY
            name ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(consumer_from_row).collect()
}

/// 插入新消费者行
pub async fn insert(conn: &mut PgConnection, consumer: &Consumer) -> DomainResult<()> {
    sqlx::query(
        r#"
        INSERT INTO
            consumer (id, stream, name, acked_id, retroactive)
        VALUES
            ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(consumer.id())
    .bind(consumer.stream())
    .bind(consumer.name())
    .bind(consumer.acked_id())
    .bind(consumer.retroactive())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// 更新消费者位点
pub async fn update(conn: &mut PgConnection, consumer: &Consumer) -> DomainResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE
            consumer
        SET
            acked_id = $2
        WHERE
            id = $1
        "#,
    )
    .bind(consumer.id())
    .bind(consumer.acked_id())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DomainError::NotFound {
            reason: format!("consumer {} not found", consumer.id()),
        });
    }

    Ok(())
}

fn consumer_from_row(row: &PgRow) -> DomainResult<Consumer> {
    Ok(Consumer::restore(
        row.try_get::<Uuid, _>("id").map_err(DomainError::from)?,
        row.try_get::<String, _>("stream").map_err(DomainError::from)?,
        row.try_get::<String, _>("name").map_err(DomainError::from)?,
        row.try_get::<String, _>("acked_id").map_err(DomainError::from)?,
        row.try_get::<bool, _>("retroactive").map_err(DomainError::from)?,
    ))
}
