//! 逻辑表结构
//!
//! 供本地开发与测试环境直接建表；生产环境可由上层迁移工具接管。
//!
use eventum_domain::error::DomainResult;
use sqlx::PgPool;

pub const CREATE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id UUID PRIMARY KEY,
    stream_id UUID NOT NULL,
    type TEXT NOT NULL,
    version BIGINT NOT NULL,
    created TIMESTAMPTZ NOT NULL,
    data JSONB NOT NULL,
    UNIQUE (stream_id, version)
)
"#;

pub const CREATE_MESSAGE_OUTBOX: &str = r#"
CREATE TABLE IF NOT EXISTS message_outbox (
    id UUID PRIMARY KEY,
    type TEXT NOT NULL,
    data JSONB NOT NULL
)
"#;

pub const CREATE_PROCESSED_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS processed_messages (
    id UUID PRIMARY KEY
)
"#;

pub const CREATE_CONSUMER: &str = r#"
CREATE TABLE IF NOT EXISTS consumer (
    id UUID PRIMARY KEY,
    stream TEXT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    acked_id TEXT NOT NULL,
    retroactive BOOLEAN NOT NULL
)
"#;

/// 幂等建表：按依赖顺序执行全部 DDL
pub async fn ensure_schema(pool: &PgPool) -> DomainResult<()> {
    for statement in [
        CREATE_EVENTS,
        CREATE_MESSAGE_OUTBOX,
        CREATE_PROCESSED_MESSAGES,
        CREATE_CONSUMER,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::debug!("database schema ensured");
    Ok(())
}
