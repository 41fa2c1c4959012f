//! 命令（Command）
//!
//! 表达"意图"的写操作请求，请求恰好一次状态转移；
//! 命令本身不进入事件流。
//!
use uuid::Uuid;

/// 命令消息需要满足的最小接口
///
/// 关联常量：
/// - `NAME`：命令的稳定名称，用于日志、追踪与路由，避免依赖 `type_name::<T>()`。
pub trait Command: Send + Sync + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 消息标识（幂等处理账本以此去重）
    fn command_id(&self) -> Uuid;

    /// 发起命令的客户端标识
    fn client_id(&self) -> Uuid;
}
