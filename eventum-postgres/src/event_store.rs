//! 事件存储（event_store）
//!
//! 在调用方事务内按流追加事件行、按位点升序读取事件行。
//! 追加遵循全有或全无：任何一行失败都使整个工作单元回滚。
//!
use eventum_domain::error::{DomainError, DomainResult};
use eventum_domain::persist::StoredEvent;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

/// 追加一批事件行。`(stream_id, version)` 唯一约束冲突
/// 映射为 `DuplicateVersion`（乐观并发碰撞）。
pub async fn append(conn: &mut PgConnection, events: &[StoredEvent]) -> DomainResult<()> {
    for event in events {
        sqlx::query(
            r#"
            INSERT INTO
                events (id, stream_id, type, version, created, data)
            VALUES
                ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.event_id())
        .bind(event.stream_id())
        .bind(event.event_type())
        .bind(event.version())
        .bind(event.created())
        .bind(event.data())
        .execute(&mut *conn)
        .await
        .map_err(|err| map_append_error(err, event))?;
    }

    Ok(())
}

/// 读取一个聚合流的全部事件行，按位点升序
pub async fn read_stream(
    conn: &mut PgConnection,
    stream_id: Uuid,
) -> DomainResult<Vec<StoredEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT
            id, stream_id, type, version, created, data
        FROM
            events
        WHERE
            stream_id = $1
        ORDER BY
            version ASC
        "#,
    )
    .bind(stream_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(stored_event_from_row).collect()
}

fn map_append_error(err: sqlx::Error, event: &StoredEvent) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DomainError::DuplicateVersion {
                stream_id: event.stream_id(),
                version: event.version(),
            };
        }
    }
    DomainError::from(err)
}

fn stored_event_from_row(row: &PgRow) -> DomainResult<StoredEvent> {
    Ok(StoredEvent::builder()
        .event_id(row.try_get("id").map_err(DomainError::from)?)
        .stream_id(row.try_get("stream_id").map_err(DomainError::from)?)
        .event_type(row.try_get("type").map_err(DomainError::from)?)
        .version(row.try_get("version").map_err(DomainError::from)?)
        .created(row.try_get("created").map_err(DomainError::from)?)
        .data(row.try_get("data").map_err(DomainError::from)?)
        .build())
}
