use eventum_domain::error::DomainError;

/// 应用层统一错误类型
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    /// 处理器内部抛出的任意错误（带处理器标识）
    #[error("handler error: handler={handler}")]
    Handler {
        handler: String,
        #[source]
        source: anyhow::Error,
    },

    /// 事件流代理交互失败
    #[error("broker error: {0}")]
    Broker(#[source] anyhow::Error),
}
