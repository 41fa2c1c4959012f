//! 领域层统一错误定义
//!
//! 聚焦序列化、事件存储、发件箱、处理账本与命令校验等最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;
use uuid::Uuid;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/解码 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("unknown event type: {event_type}")]
    UnknownEventType { event_type: String },

    // --- 仓储/持久化 ---
    #[error("not found: {reason}")]
    NotFound { reason: String },
    #[error("duplicate version: stream={stream_id}, version={version}")]
    DuplicateVersion { stream_id: Uuid, version: i64 },
    #[error("duplicate message: {message_id}")]
    DuplicateMessage { message_id: Uuid },
    #[error("database error: {reason}")]
    Database { reason: String },

    // --- 装配/配置 ---
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    // --- 领域规则/命令与状态 ---
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ---- Cross-crate conversions for infrastructure convenience ----
// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 DomainError

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound {
                reason: "row not found".to_string(),
            },
            other => DomainError::Database {
                reason: other.to_string(),
            },
        }
    }
}
